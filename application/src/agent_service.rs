use domain::model::{ChatModel, ChatRequest, Completion};
use domain::tool::{ToolCall, ToolRegistry};
use domain::turn::Turn;
use shared::telemetry::Telemetry;
use shared::types::Result;
use tracing::{debug, info, warn};

/// Placeholder result recorded when a requested tool cannot be run.
pub const NO_TOOL_FOUND: &str = "No tool found!";

/// Where the tool loop is between two model calls.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    AwaitingInput,
    QueryingModel,
    ExecutingTools(Vec<ToolCall>),
    FinalAnswer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Completed(String),
    Failed(String),
}

/// What happened to one requested tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEvent {
    pub call: ToolCall,
    pub outcome: ToolOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub tool_events: Vec<ToolEvent>,
    pub answer: String,
}

/// Multi-step loop: ask the model, run any tools it requests, ask again.
pub struct AgentService<M> {
    model: M,
    registry: ToolRegistry,
    messages: Vec<Turn>,
    state: LoopState,
}

impl<M: ChatModel> AgentService<M> {
    pub fn new(model: M, registry: ToolRegistry) -> Self {
        Self {
            model,
            registry,
            messages: Vec::new(),
            state: LoopState::AwaitingInput,
        }
    }

    pub fn messages(&self) -> &[Turn] {
        &self.messages
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one question. Blank input is skipped and yields `None`.
    ///
    /// A model failure propagates; the question stays in the message list and
    /// the loop returns to `AwaitingInput`.
    pub async fn ask(&mut self, question: &str) -> Result<Option<AgentReply>> {
        if question.trim().is_empty() {
            return Ok(None);
        }

        self.messages.push(Turn::user(question));
        self.state = LoopState::QueryingModel;
        let result = self.drive().await;
        self.state = LoopState::AwaitingInput;
        result.map(Some)
    }

    async fn drive(&mut self) -> Result<AgentReply> {
        let mut tool_events = Vec::new();
        loop {
            match std::mem::replace(&mut self.state, LoopState::AwaitingInput) {
                LoopState::QueryingModel => {
                    let completion = self.query().await?;
                    if completion.tool_calls.is_empty() {
                        return Ok(self.finish(completion, tool_events));
                    }
                    self.messages.push(Turn::assistant_with_calls(
                        completion.content,
                        completion.tool_calls.clone(),
                    ));
                    self.state = LoopState::ExecutingTools(completion.tool_calls);
                }
                LoopState::ExecutingTools(calls) => {
                    for call in calls {
                        tool_events.push(self.execute(call));
                    }
                    self.state = LoopState::FinalAnswer;
                }
                LoopState::FinalAnswer => {
                    let completion = self.query().await?;
                    if !completion.tool_calls.is_empty() {
                        debug!(
                            count = completion.tool_calls.len(),
                            "ignoring tool calls requested after tool results"
                        );
                    }
                    return Ok(self.finish(completion, tool_events));
                }
                LoopState::AwaitingInput => unreachable!("drive starts in QueryingModel"),
            }
        }
    }

    async fn query(&self) -> Result<Completion> {
        let telemetry = Telemetry::new();
        let request =
            ChatRequest::new(self.messages.clone()).with_tools(self.registry.specs());
        let completion = self.model.complete(request).await?;
        info!(
            tool_calls = completion.tool_calls.len(),
            elapsed_ms = telemetry.elapsed_ms() as u64,
            "model responded"
        );
        Ok(completion)
    }

    /// Run one call. Any failure is recorded against this call's id and the
    /// loop carries on.
    fn execute(&mut self, call: ToolCall) -> ToolEvent {
        let outcome = match self.registry.invoke(&call) {
            Ok(result) => {
                info!(tool = %call.name, id = %call.id, "tool call completed");
                self.messages
                    .push(Turn::tool_result(&call.id, &call.name, result.clone()));
                ToolOutcome::Completed(result)
            }
            Err(err) => {
                warn!(tool = %call.name, id = %call.id, error = %err, "tool call failed");
                self.messages
                    .push(Turn::tool_result(&call.id, &call.name, NO_TOOL_FOUND));
                ToolOutcome::Failed(err.to_string())
            }
        };
        ToolEvent { call, outcome }
    }

    fn finish(&mut self, completion: Completion, tool_events: Vec<ToolEvent>) -> AgentReply {
        self.messages.push(Turn::assistant(completion.content.clone()));
        AgentReply {
            tool_events,
            answer: completion.content,
        }
    }
}
