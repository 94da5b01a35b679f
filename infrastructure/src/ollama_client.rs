use crate::config::Config;
use crate::ndjson::LineBuffer;
use anyhow::Context;
use domain::model::{ChatModel, ChatRequest, Completion, FragmentStream};
use domain::tool::{ToolCall, ToolSpec};
use domain::turn::Turn;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::types::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Default)]
struct Message {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireToolCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Serialize, Deserialize, Debug)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a ToolSpec,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        let mut message = Message {
            role: turn.role().to_string(),
            content: turn.content().to_string(),
            ..Default::default()
        };
        match turn {
            Turn::Assistant { tool_calls, .. } => {
                message.tool_calls = tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: Some(call.id.clone()),
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect();
            }
            Turn::ToolResult { name, .. } => message.tool_name = Some(name.clone()),
            Turn::System { .. } | Turn::User { .. } => {}
        }
        message
    }
}

impl WireToolCall {
    fn into_tool_call(self, index: usize) -> ToolCall {
        // Some servers send the argument object JSON-encoded in a string.
        let arguments = match self.function.arguments {
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            other => other,
        };
        ToolCall {
            id: self.id.unwrap_or_else(|| format!("call_{index}")),
            name: self.function.name,
            arguments,
        }
    }
}

/// Parse a non-streaming body: a single JSON object, or NDJSON when the server
/// streams anyway.
fn parse_completion(body: &str) -> Result<Completion> {
    let responses: Vec<ChatResponse> = match serde_json::from_str::<ChatResponse>(body) {
        Ok(single) => vec![single],
        Err(_) => body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str::<ChatResponse>(line).ok())
            .collect(),
    };
    if responses.is_empty() {
        anyhow::bail!("Ollama returned an unreadable body: {}", body.trim());
    }

    let mut content = String::new();
    let mut wire_calls = Vec::new();
    for response in responses {
        if let Some(err) = response.error {
            anyhow::bail!("Ollama API error: {}", err);
        }
        if let Some(message) = response.message {
            content.push_str(&message.content);
            wire_calls.extend(message.tool_calls);
        }
        if response.done {
            break;
        }
    }

    let tool_calls = wire_calls
        .into_iter()
        .enumerate()
        .map(|(index, call)| call.into_tool_call(index))
        .collect();
    Ok(Completion {
        content,
        tool_calls,
    })
}

/// One streamed line: `Some(text)` to emit, `None` to skip, or a server error.
fn parse_stream_line(line: &str) -> Result<(Option<String>, bool)> {
    let chunk = match serde_json::from_str::<ChatResponse>(line) {
        Ok(chunk) => chunk,
        Err(err) => {
            debug!(error = %err, "skipping unreadable stream line");
            return Ok((None, false));
        }
    };
    if let Some(err) = chunk.error {
        anyhow::bail!("Ollama stream error: {}", err);
    }
    let text = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());
    Ok((text, chunk.done))
}

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    lines: LineBuffer,
    ready: VecDeque<String>,
    eof: bool,
    stop: bool,
}

fn fragments(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> FragmentStream {
    let state = StreamState {
        body,
        lines: LineBuffer::default(),
        ready: VecDeque::new(),
        eof: false,
        stop: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            if st.stop {
                return None;
            }
            if let Some(line) = st.ready.pop_front() {
                match parse_stream_line(&line) {
                    Ok((text, done)) => {
                        st.stop = done;
                        if let Some(text) = text {
                            return Some((Ok(text), st));
                        }
                        continue;
                    }
                    Err(err) => {
                        st.stop = true;
                        return Some((Err(err), st));
                    }
                }
            }
            if st.eof {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    let lines = st.lines.push(&bytes);
                    st.ready.extend(lines);
                }
                Some(Err(err)) => {
                    st.stop = true;
                    return Some((Err(anyhow::Error::from(err).context("Ollama stream interrupted")), st));
                }
                None => {
                    st.eof = true;
                    let tail = st.lines.finish();
                    st.ready.extend(tail);
                }
            }
        }
    })
    .boxed()
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, turns: &[Turn], tools: &'a [ToolSpec], stream: bool) -> WireRequest<'a> {
        WireRequest {
            model: &self.model,
            messages: turns.iter().map(Message::from).collect(),
            tools: tools
                .iter()
                .map(|spec| WireTool {
                    kind: "function",
                    function: spec,
                })
                .collect(),
            stream,
            options: Options {
                temperature: self.temperature,
            },
        }
    }

    async fn post(&self, request: &WireRequest<'_>) -> Result<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            stream = request.stream,
            "posting chat request"
        );
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed contacting Ollama")?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error ({}): {}", status, text));
        }
        Ok(response)
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<Completion> {
        let wire = self.request(&request.turns, &request.tools, false);
        let text = self.post(&wire).await?.text().await?;
        parse_completion(&text)
    }

    pub async fn chat_stream(&self, turns: Vec<Turn>) -> Result<FragmentStream> {
        let wire = self.request(&turns, &[], true);
        let response = self.post(&wire).await?;
        let body = response.bytes_stream().map_ok(|bytes| bytes.to_vec()).boxed();
        Ok(fragments(body))
    }
}

impl ChatModel for OllamaClient {
    async fn complete(&self, request: ChatRequest) -> Result<Completion> {
        self.chat(request).await
    }

    async fn stream(&self, turns: Vec<Turn>) -> Result<FragmentStream> {
        self.chat_stream(turns).await
    }
}
