//! Test doubles shared across unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::registry::SessionStatus;
use crate::surface::{ChatMessage, ChatSurface, MessageMeta};

/// Install a test-writer subscriber so `RUST_LOG` controls bridge log
/// output during tests. Safe to call from every test; only the first
/// installation wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory [`ChatSurface`] that models real message semantics:
/// `push` appends, `append_to_last_assistant` grows the latest assistant
/// message, `replace_last_assistant` finalizes it. Indicator updates are
/// recorded per chat.
#[derive(Default)]
pub struct RecordingSurface {
    messages: Mutex<HashMap<String, Vec<ChatMessage>>>,
    indicators: Mutex<HashMap<String, Vec<SessionStatus>>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn last_indicator(&self, chat_id: &str) -> Option<SessionStatus> {
        self.indicators
            .lock()
            .unwrap()
            .get(chat_id)
            .and_then(|v| v.last().copied())
    }

    pub fn indicators(&self, chat_id: &str) -> Vec<SessionStatus> {
        self.indicators
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl ChatSurface for RecordingSurface {
    fn push_message(&self, chat_id: &str, message: ChatMessage) {
        self.messages
            .lock()
            .unwrap()
            .entry(chat_id.to_string())
            .or_default()
            .push(message);
    }

    fn append_to_last_assistant(&self, chat_id: &str, fragment: &str) {
        let mut messages = self.messages.lock().unwrap();
        if let Some(last) = messages
            .entry(chat_id.to_string())
            .or_default()
            .iter_mut()
            .rev()
            .find(|m| m.role == crate::surface::Role::Assistant)
        {
            last.content.push_str(fragment);
            last.done = false;
        }
    }

    fn replace_last_assistant(&self, chat_id: &str, content: String, meta: MessageMeta) {
        let mut messages = self.messages.lock().unwrap();
        if let Some(last) = messages
            .entry(chat_id.to_string())
            .or_default()
            .iter_mut()
            .rev()
            .find(|m| m.role == crate::surface::Role::Assistant)
        {
            last.content = content;
            last.done = true;
            last.meta = meta;
        }
    }

    fn set_indicator(&self, chat_id: &str, status: SessionStatus) {
        self.indicators
            .lock()
            .unwrap()
            .entry(chat_id.to_string())
            .or_default()
            .push(status);
    }
}
