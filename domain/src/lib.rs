pub mod model;
pub mod prompt;
pub mod session;
pub mod tool;
pub mod turn;

pub use model::{ChatModel, ChatRequest, Completion, FragmentStream};
pub use prompt::{PromptEntry, PromptTemplate};
pub use session::{ConversationState, HISTORY_WINDOW};
pub use tool::{Tool, ToolCall, ToolError, ToolRegistry, ToolSpec};
pub use turn::{FlatRecord, Turn, TurnError};
