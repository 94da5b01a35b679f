use crate::ui::{read_user_input, ChatUi, HtmlSurface};
use anyhow::Context;
use application::chat_service::ChatService;
use application::session_store::{SessionStore, SharedState};
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use domain::model::ChatModel;
use domain::turn::Turn;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use shared::types::Result;
use shared::utils::html_escape;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "parley_session";

#[derive(Debug, Clone)]
pub struct PageConfig {
    pub title: String,
    pub subheading: String,
    pub preamble: String,
}

pub struct AppState<M> {
    sessions: Arc<SessionStore>,
    chat: ChatService<M>,
    page: Arc<PageConfig>,
}

impl<M> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            chat: self.chat.clone(),
            page: Arc::clone(&self.page),
        }
    }
}

impl<M: ChatModel> AppState<M> {
    pub fn new(model: Arc<M>, page: PageConfig) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            chat: ChatService::new(model),
            page: Arc::new(page),
        }
    }

    /// Discard sessions idle for longer than `idle_ttl`.
    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.sessions = Arc::new(SessionStore::with_idle_ttl(idle_ttl));
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[derive(Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    message: String,
}

pub fn router<M: ChatModel + 'static>(state: AppState<M>) -> Router {
    Router::new()
        .route("/", get(chat_page::<M>))
        .route("/chat", post(post_chat::<M>))
        .with_state(state)
}

pub async fn serve<M: ChatModel + 'static>(bind: &str, state: AppState<M>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %listener.local_addr()?, "chat UI listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, id)| id.to_string())
        .filter(|id| !id.is_empty())
}

/// Existing session id, or a fresh one plus the cookie that assigns it.
fn resolve_session(headers: &HeaderMap) -> (String, Option<HeaderValue>) {
    match session_cookie(headers) {
        Some(id) => (id, None),
        None => {
            let id = Uuid::new_v4().to_string();
            let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
            (id, HeaderValue::from_str(&cookie).ok())
        }
    }
}

fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn internal_error(err: anyhow::Error) -> Response {
    error!(error = %err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
}

/// GET /: the page with the session's history.
#[instrument(skip_all)]
async fn chat_page<M: ChatModel + 'static>(
    State(state): State<AppState<M>>,
    headers: HeaderMap,
) -> Response {
    let (session_id, cookie) = resolve_session(&headers);
    let session = state.sessions.initialize(&session_id, &state.page.preamble).await;
    let conversation = session.lock().await;

    let body = match ChatUi::new(
        &state.page.title,
        &conversation,
        &state.page.subheading,
        HtmlSurface::new(),
    ) {
        Ok(ui) => ui.into_surface().into_html(),
        Err(err) => return internal_error(err),
    };
    with_cookie(Html(page_document(&state.page.title, &body)).into_response(), cookie)
}

/// POST /chat: echo the user turn, then stream the reply as SSE.
#[instrument(skip_all)]
async fn post_chat<M: ChatModel + 'static>(
    State(state): State<AppState<M>>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let (session_id, cookie) = resolve_session(&headers);

    let mut surface = HtmlSurface::new();
    let user = match read_user_input(&mut surface, Some(&form.message)) {
        Ok(Some(user)) => user,
        Ok(None) => return with_cookie(StatusCode::NO_CONTENT.into_response(), cookie),
        Err(err) => return internal_error(err),
    };

    let session = state.sessions.initialize(&session_id, &state.page.preamble).await;
    let (tx, rx) = mpsc::unbounded_channel();
    let _ = tx.send(sse_event("user", surface.as_str()));
    tokio::spawn(run_exchange(state.chat.clone(), session, user, tx));

    let events = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    with_cookie(
        Sse::new(events).keep_alive(KeepAlive::default()).into_response(),
        cookie,
    )
}

fn sse_event(name: &str, data: &str) -> Event {
    Event::default().event(name).data(json!(data).to_string())
}

/// Runs to completion even if the browser goes away. The session stays locked
/// for the whole exchange so turns from one session never interleave.
async fn run_exchange<M: ChatModel>(
    chat: ChatService<M>,
    session: SharedState,
    user: Turn,
    tx: mpsc::UnboundedSender<Event>,
) {
    let mut conversation = session.lock().await;
    let result = chat
        .respond(&mut conversation, user, |fragment| {
            let _ = tx.send(sse_event("fragment", fragment));
        })
        .await;
    match result {
        Ok(reply) => {
            info!(turns = conversation.len(), chars = reply.len(), "exchange recorded");
            let _ = tx.send(sse_event("done", ""));
        }
        Err(err) => {
            warn!(error = %err, "model reply failed");
            let _ = tx.send(sse_event("error", &err.to_string()));
        }
    }
}

fn page_document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
<script src="https://cdn.jsdelivr.net/npm/marked/marked.min.js"></script>
</head>
<body>
<main>
<section id="chat">
{body}</section>
<form id="chat-input" autocomplete="off">
<input name="message" placeholder="Your message" autofocus>
<button type="submit">Send</button>
</form>
</main>
<script>{SCRIPT}</script>
</body>
</html>
"#,
        title = html_escape(title),
    )
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #fafafa; }
main { max-width: 46rem; margin: 0 auto; padding: 2rem 1rem 6rem; }
.subheading { color: #555; }
.chat-message { display: flex; gap: .75rem; margin: 1rem 0; }
.avatar { flex: 0 0 5rem; font-size: .75rem; text-transform: uppercase; color: #888; padding-top: .3rem; }
.chat-message[data-role="user"] .content { background: #eef3ff; }
.content { flex: 1; background: #fff; border-radius: .5rem; padding: .5rem .9rem; }
.error { color: #b00020; }
#chat-input { position: fixed; bottom: 0; left: 0; right: 0; display: flex; gap: .5rem;
  padding: 1rem; background: #fff; border-top: 1px solid #ddd; }
#chat-input input { flex: 1; padding: .6rem; font-size: 1rem; }
"#;

const SCRIPT: &str = r#"
const chat = document.getElementById('chat');
const form = document.getElementById('chat-input');
const render = (text) => window.marked ? marked.parse(text) : text;
document.querySelectorAll('.chat-message .content').forEach((el) => {
  el.innerHTML = render(el.innerHTML);
});

function bubble(role) {
  const wrap = document.createElement('div');
  wrap.className = 'chat-message';
  wrap.dataset.role = role;
  wrap.innerHTML = '<div class="avatar">' + role + '</div><div class="content"></div>';
  chat.appendChild(wrap);
  return wrap.querySelector('.content');
}

function handle(event, data, reply) {
  if (event === 'user') {
    chat.insertAdjacentHTML('beforeend', data);
  } else if (event === 'fragment') {
    reply.text += data;
    if (!reply.el) reply.el = bubble('assistant');
    reply.el.innerHTML = render(reply.text);
  } else if (event === 'error') {
    const el = reply.el || bubble('assistant');
    el.innerHTML = '<span class="error"></span>';
    el.firstChild.textContent = data;
  }
  window.scrollTo(0, document.body.scrollHeight);
}

form.addEventListener('submit', async (e) => {
  e.preventDefault();
  const input = form.elements.message;
  const message = input.value;
  input.value = '';
  const res = await fetch('/chat', { method: 'POST', body: new URLSearchParams({ message }) });
  if (res.status !== 200) return;
  const reader = res.body.getReader();
  const decoder = new TextDecoder();
  const reply = { text: '', el: null };
  let buffer = '';
  for (;;) {
    const { value, done } = await reader.read();
    if (done) break;
    buffer += decoder.decode(value, { stream: true });
    let cut;
    while ((cut = buffer.indexOf('\n\n')) >= 0) {
      const block = buffer.slice(0, cut);
      buffer = buffer.slice(cut + 2);
      let event = 'message';
      let data = '';
      for (const line of block.split('\n')) {
        if (line.startsWith('event:')) event = line.slice(6).trim();
        else if (line.startsWith('data:')) data += line.slice(5).trim();
      }
      if (!data) continue;
      handle(event, JSON.parse(data), reply);
      if (event === 'done' || event === 'error') return;
    }
  }
});
"#;
