//! Test doubles shared by the integration tests.

use domain::model::{ChatModel, ChatRequest, Completion, FragmentStream};
use domain::turn::Turn;
use futures::{stream, StreamExt};
use shared::types::Result;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    completions: Mutex<VecDeque<Completion>>,
    replies: Mutex<VecDeque<Vec<String>>>,
    requests: Mutex<Vec<ChatRequest>>,
    prompts: Mutex<Vec<Vec<Turn>>>,
}

/// A model that answers from a script and remembers what it was asked.
/// Clones share the same script.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    script: Arc<Script>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completions(completions: Vec<Completion>) -> Self {
        let model = Self::new();
        model.script.completions.lock().unwrap().extend(completions);
        model
    }

    /// Queue one streamed reply made of `fragments`.
    pub fn push_reply(&self, fragments: &[&str]) {
        self.script
            .replies
            .lock()
            .unwrap()
            .push_back(fragments.iter().map(|f| f.to_string()).collect());
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.script.requests.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<Vec<Turn>> {
        self.script.prompts.lock().unwrap().clone()
    }
}

impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<Completion> {
        self.script.requests.lock().unwrap().push(request);
        self.script
            .completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted completion left"))
    }

    async fn stream(&self, turns: Vec<Turn>) -> Result<FragmentStream> {
        self.script.prompts.lock().unwrap().push(turns);
        let fragments = self
            .script
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))?;
        Ok(stream::iter(fragments.into_iter().map(Ok)).boxed())
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn spawn_server(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
