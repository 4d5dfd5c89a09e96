//! # research-bridge
//!
//! Client-side session bridge between a chat UI and a streaming
//! deep-research backend. For each research chat the bridge provisions a
//! backend session over HTTP, opens a persistent WebSocket for progress
//! events, and maps those events to chat mutations on the host's UI.
//!
//! ## Architecture
//!
//! ```text
//! lib.rs        — public surface, re-exports
//! config.rs     — endpoint configuration (host-provided + env fallback)
//! client.rs     — HTTP client for backend REST endpoints
//! protocol.rs   — wire frames and the StreamEvent sum type
//! stream.rs     — WebSocket transport with epoch-guarded reconnect
//! registry.rs   — chat-id → session map, owned by the controller
//! dispatch.rs   — event kind → UI mutation table
//! surface.rs    — ChatSurface trait: the host UI boundary
//! controller.rs — lifecycle controller and query admission gate
//! ```
//!
//! ## Usage
//!
//! The host implements [`ChatSurface`], builds a [`SessionController`], and
//! forwards three callbacks into it: chat created → `create_session`, user
//! message → `handle_user_message`, chat deleted → `delete_session`.
//! Everything else — streaming, reconnection, admission, watchdog — happens
//! inside the bridge.

pub mod client;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod protocol;
pub mod registry;
pub mod stream;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{BackendClient, ClientError};
pub use config::{BridgeConfig, ConfigError};
pub use controller::{SessionController, SubmitError};
pub use protocol::StreamEvent;
pub use registry::{SessionRegistry, SessionStatus};
pub use surface::{ChatMessage, ChatSurface, MessageMeta, Role};
