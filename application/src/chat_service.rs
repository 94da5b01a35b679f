use domain::model::{ChatModel, FragmentStream};
use domain::session::ConversationState;
use domain::turn::Turn;
use futures::StreamExt;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Single-turn streaming chat: prompt template -> model -> text fragments.
pub struct ChatService<M> {
    model: Arc<M>,
}

impl<M> Clone for ChatService<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
        }
    }
}

impl<M: ChatModel> ChatService<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// Start streaming a reply to `user_input` given the current history.
    pub async fn stream_reply(
        &self,
        state: &ConversationState,
        user_input: &str,
    ) -> Result<FragmentStream> {
        let prompt = state.build_prompt_sequence(user_input);
        debug!(turns = prompt.len(), "streaming chat prompt");
        self.model.stream(prompt).await
    }

    /// Drain a fragment stream, handing each piece to `on_fragment`, and return
    /// the concatenated reply.
    pub async fn collect_reply<F>(mut fragments: FragmentStream, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let telemetry = Telemetry::new();
        let mut reply = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            reply.push_str(&fragment);
        }
        info!(
            chars = reply.len(),
            elapsed_ms = telemetry.elapsed_ms() as u64,
            "reply stream finished"
        );
        Ok(reply)
    }

    /// Record a finished exchange: the user turn first, then the reply.
    pub fn commit(state: &mut ConversationState, user: Turn, reply: String) -> Result<()> {
        state.add_turn(user)?;
        state.add_turn(Turn::assistant(reply))?;
        Ok(())
    }

    /// Run one full exchange against a state owned by the caller. History is
    /// only touched once the whole reply has arrived.
    pub async fn respond<F>(
        &self,
        state: &mut ConversationState,
        user: Turn,
        on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let fragments = self.stream_reply(state, user.content()).await?;
        let reply = Self::collect_reply(fragments, on_fragment).await?;
        Self::commit(state, user, reply.clone())?;
        Ok(reply)
    }
}
