//! Session registry: the process's map from chat id to session record.
//!
//! The registry is the sole owner of [`Session`] records. It is an owned
//! object held by the controller (not a global), so independent controllers
//! — one per test, say — never share state.
//!
//! Registry membership doubles as the cancellation signal for the stream
//! transport: a reconnect attempt whose session is gone, or whose connection
//! epoch has been superseded, gives up instead of firing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::stream::StreamHandle;

/// Session lifecycle status, driving admission and the UI indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No query in flight; new queries are admitted.
    Idle,
    /// Exactly one query outstanding; further queries are rejected.
    Processing,
    /// Backend provisioning failed at creation. Queries are still admitted
    /// (the backend provisions lazily on first query).
    Error,
}

/// Client-side record of one research conversation.
pub struct Session {
    /// Host-assigned chat identifier; primary key in the registry.
    pub chat_id: String,
    /// Client-generated backend session identifier.
    pub session_id: String,
    pub status: SessionStatus,
    /// Connection epoch: bumped on every transport open. Stream callbacks
    /// carrying a stale epoch are discarded.
    pub epoch: u64,
    /// Bumped on every admitted query; guards stale watchdogs.
    pub query_seq: u64,
    /// The live stream transport, if any. At most one per session.
    pub stream: Option<StreamHandle>,
}

impl Session {
    fn new(chat_id: String, session_id: String) -> Self {
        Self {
            chat_id,
            session_id,
            status: SessionStatus::Idle,
            epoch: 0,
            query_seq: 0,
            stream: None,
        }
    }
}

/// Process-wide map from chat id to session record.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert a fresh session. Returns `false` without touching the map if
    /// the chat id is already registered — callers must `remove` first.
    pub async fn create(&self, chat_id: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(chat_id) {
            return false;
        }
        sessions.insert(
            chat_id.to_string(),
            Session::new(chat_id.to_string(), session_id.to_string()),
        );
        true
    }

    pub async fn contains(&self, chat_id: &str) -> bool {
        self.sessions.lock().await.contains_key(chat_id)
    }

    /// Remove and return the session record, handing ownership (including
    /// the stream handle) to the caller.
    pub async fn remove(&self, chat_id: &str) -> Option<Session> {
        self.sessions.lock().await.remove(chat_id)
    }

    pub async fn status(&self, chat_id: &str) -> Option<SessionStatus> {
        self.sessions.lock().await.get(chat_id).map(|s| s.status)
    }

    pub async fn session_id(&self, chat_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(chat_id)
            .map(|s| s.session_id.clone())
    }

    /// Run `f` against the session record, if present.
    pub async fn with_session<R>(
        &self,
        chat_id: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        self.sessions.lock().await.get_mut(chat_id).map(f)
    }

    /// Whether `epoch` is still the session's current connection epoch.
    /// A removed session is never current.
    pub async fn epoch_is_current(&self, chat_id: &str, epoch: u64) -> bool {
        self.sessions
            .lock()
            .await
            .get(chat_id)
            .is_some_and(|s| s.epoch == epoch)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
