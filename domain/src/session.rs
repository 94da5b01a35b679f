use crate::prompt::PromptTemplate;
use crate::turn::{FlatRecord, Turn, TurnError};

/// Number of most recent turns that make it into a prompt.
pub const HISTORY_WINDOW: usize = 50;

/// Turn history for one chat session.
///
/// Keeps two index-aligned views of the same turns: the rich [`Turn`] list used
/// to build prompts, and the flat `{role, content}` list used for display.
/// The system preamble is held apart and never enters either list.
#[derive(Debug, Clone)]
pub struct ConversationState {
    preamble: Turn,
    history: Vec<Turn>,
    flat_history: Vec<FlatRecord>,
}

impl ConversationState {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            preamble: Turn::system(preamble),
            history: Vec::new(),
            flat_history: Vec::new(),
        }
    }

    pub fn preamble(&self) -> &Turn {
        &self.preamble
    }

    /// Append a turn to both views. A turn without a flat form is rejected and
    /// neither view changes.
    pub fn add_turn(&mut self, turn: Turn) -> Result<(), TurnError> {
        let flat = turn.to_flat_record()?;
        self.history.push(turn);
        self.flat_history.push(flat);
        Ok(())
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn flat_history(&self) -> &[FlatRecord] {
        &self.flat_history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Preamble, then the last [`HISTORY_WINDOW`] turns, then the user-input slot.
    pub fn prompt_template(&self) -> PromptTemplate {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        PromptTemplate::new(
            std::iter::once(self.preamble.clone()).chain(self.history[start..].iter().cloned()),
        )
    }

    pub fn build_prompt_sequence(&self, user_input: &str) -> Vec<Turn> {
        self.prompt_template().fill(user_input)
    }
}
