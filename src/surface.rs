//! Host chat UI boundary.
//!
//! The bridge never renders anything itself. Every UI effect goes through
//! [`ChatSurface`], implemented by the host application. Implementations are
//! expected to be cheap and non-blocking — they are invoked from the stream
//! read loop between frames.

use crate::registry::SessionStatus;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
    /// Transient tool-progress line ("thinking" message).
    Thinking,
}

/// Metadata attached to a finalized assistant message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageMeta {
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Elapsed research time, pre-rendered (e.g. `"1.23s"`).
    pub process_time: Option<String>,
    pub error: bool,
}

/// A message pushed into a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// `false` while an assistant message is still streaming.
    pub done: bool,
    pub meta: MessageMeta,
}

impl ChatMessage {
    /// A completed message with no metadata.
    pub fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            done: true,
            meta: MessageMeta::default(),
        }
    }

    /// An assistant message that is still streaming.
    pub fn streaming(content: impl Into<String>, meta: MessageMeta) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            done: false,
            meta,
        }
    }
}

/// Primitives the host chat UI must provide.
///
/// `chat_id` is the host's own identifier for the conversation; the bridge
/// treats it as opaque.
pub trait ChatSurface: Send + Sync {
    /// Append a message to the chat.
    fn push_message(&self, chat_id: &str, message: ChatMessage);

    /// Append a streamed fragment to the most recent assistant message,
    /// leaving it marked not-yet-complete.
    fn append_to_last_assistant(&self, chat_id: &str, fragment: &str);

    /// Replace the most recent assistant message's content, mark it
    /// complete, and attach metadata.
    fn replace_last_assistant(&self, chat_id: &str, content: String, meta: MessageMeta);

    /// Update the chat's status indicator.
    fn set_indicator(&self, chat_id: &str, status: SessionStatus);
}
