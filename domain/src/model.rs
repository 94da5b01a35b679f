use futures::stream::BoxStream;
use shared::types::Result;
use std::future::Future;

use crate::tool::{ToolCall, ToolSpec};
use crate::turn::Turn;

/// Lazily produced reply fragments. Finite, and consumed once.
pub type FragmentStream = BoxStream<'static, Result<String>>;

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolSpec>,
}

impl ChatRequest {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self {
            turns,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }
}

/// A chat-style language model.
pub trait ChatModel: Send + Sync {
    fn complete(&self, request: ChatRequest) -> impl Future<Output = Result<Completion>> + Send;

    fn stream(&self, turns: Vec<Turn>) -> impl Future<Output = Result<FragmentStream>> + Send;
}
