use domain::session::ConversationState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type SharedState = Arc<Mutex<ConversationState>>;

/// Sessions unused for this long are discarded.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct Entry {
    state: SharedState,
    last_used: Instant,
}

/// Per-session conversation state, keyed by session id.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Return the state for `session_id`, creating it with `preamble` on first
    /// use. An existing session is returned untouched. Idle sessions are
    /// evicted on the way in.
    pub async fn initialize(&self, session_id: &str, preamble: &str) -> SharedState {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        self.evict_idle(&mut sessions, now);

        let entry = sessions.entry(session_id.to_string()).or_insert_with(|| {
            info!(session = session_id, "starting chat session");
            Entry {
                state: Arc::new(Mutex::new(ConversationState::new(preamble))),
                last_used: now,
            }
        });
        entry.last_used = now;
        entry.state.clone()
    }

    /// Sessions still held elsewhere (an exchange in flight) are kept.
    fn evict_idle(&self, sessions: &mut HashMap<String, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.duration_since(entry.last_used) < self.idle_ttl
                || Arc::strong_count(&entry.state) > 1
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "evicted idle chat sessions");
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<SharedState> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|entry| entry.state.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
