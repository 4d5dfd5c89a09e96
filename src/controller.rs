//! Session lifecycle controller.
//!
//! [`SessionController`] wires the registry, the HTTP client, the stream
//! transport, and the host surface together. The host calls
//! [`SessionController::create_session`] when a research chat is opened,
//! [`SessionController::handle_user_message`] for every user-submitted
//! message, and [`SessionController::delete_session`] when the chat is
//! deleted.
//!
//! The admission gate lives in [`SessionController::submit`]: at most one
//! query may be in flight per session. Admission marks the session busy
//! optimistically — if the HTTP submission itself fails, status reverts to
//! idle and the failure is surfaced in the chat.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{BackendClient, ClientError};
use crate::config::BridgeConfig;
use crate::dispatch;
use crate::protocol::{ResearchFailure, StreamEvent};
use crate::registry::{SessionRegistry, SessionStatus};
use crate::stream::{self, StreamContext};
use crate::surface::{ChatMessage, ChatSurface, Role};

/// Welcome message emitted when a research chat is created.
pub const WELCOME_TEXT: &str = "Welcome to Deep Research. Ask a question to begin.";

/// Surfaced when a query is rejected because one is already running.
pub const BUSY_TEXT: &str =
    "Please wait for the current research to complete before sending a new query.";

/// Rejection reasons from the query admission gate.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// A query is already in flight for this session.
    #[error("a query is already in progress for this session")]
    Busy,
    /// No session is registered for this chat.
    #[error("no research session exists for this chat")]
    UnknownSession,
    /// The session was idle but the HTTP submission failed; status has
    /// already been reverted and the failure surfaced in the chat.
    #[error(transparent)]
    Backend(#[from] ClientError),
}

/// Top-level coordinator for research sessions.
pub struct SessionController {
    config: BridgeConfig,
    registry: Arc<SessionRegistry>,
    client: BackendClient,
    surface: Arc<dyn ChatSurface>,
}

impl SessionController {
    /// Build a controller against the configured backend.
    pub fn new(config: BridgeConfig, surface: Arc<dyn ChatSurface>) -> Result<Self, ClientError> {
        let client = BackendClient::new(&config)?;
        Ok(Self {
            config,
            registry: SessionRegistry::new(),
            client,
            surface,
        })
    }

    /// The controller's session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The controller's HTTP client.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Create a session for a newly opened research chat: provision backend
    /// state, register the session, open the event stream, and greet the
    /// user.
    ///
    /// Provisioning failure is degraded, not fatal: the session is still
    /// created locally (the backend provisions lazily on first query) and
    /// the welcome text is replaced by a visible error.
    pub async fn create_session(&self, chat_id: &str) {
        if self.registry.contains(chat_id).await {
            warn!(chat_id, "session already exists, ignoring create");
            return;
        }

        let session_id = Uuid::new_v4().to_string();
        let provisioned = self.client.create_session(&session_id).await;

        if !self.registry.create(chat_id, &session_id).await {
            warn!(chat_id, "session appeared concurrently, ignoring create");
            return;
        }
        self.open_stream(chat_id).await;

        match provisioned {
            Ok(_) => {
                info!(chat_id, %session_id, "session provisioned");
                self.surface
                    .push_message(chat_id, ChatMessage::plain(Role::System, WELCOME_TEXT));
            }
            Err(e) => {
                warn!(chat_id, %session_id, error = %e, "backend provisioning failed");
                self.registry
                    .with_session(chat_id, |s| s.status = SessionStatus::Error)
                    .await;
                self.surface.push_message(
                    chat_id,
                    ChatMessage::plain(
                        Role::System,
                        format!("Could not reach the research backend: {e}"),
                    ),
                );
                self.surface.set_indicator(chat_id, SessionStatus::Error);
            }
        }
    }

    /// Tear down a session: close the stream, release backend state
    /// (best-effort), and drop the registry entry.
    pub async fn delete_session(&self, chat_id: &str) {
        let Some(session) = self.registry.remove(chat_id).await else {
            debug!(chat_id, "delete for unknown session, ignoring");
            return;
        };
        if let Some(stream) = &session.stream {
            stream.close();
        }
        match self.client.delete_session(&session.session_id).await {
            Ok(_) => {
                info!(
                    chat_id = %session.chat_id,
                    session_id = %session.session_id,
                    "session released"
                );
            }
            Err(e) => {
                // Best-effort: local cleanup already happened.
                warn!(
                    chat_id = %session.chat_id,
                    session_id = %session.session_id,
                    error = %e,
                    "backend teardown failed"
                );
            }
        }
    }

    /// Submit a user query through the admission gate.
    ///
    /// On acceptance the user's message is echoed into the chat, the
    /// session is marked busy, and the query is sent to the backend.
    /// Success means the backend acknowledged receipt — the result arrives
    /// later over the stream.
    pub async fn submit(&self, chat_id: &str, text: &str) -> Result<(), SubmitError> {
        let admitted = self
            .registry
            .with_session(chat_id, |s| {
                if s.status == SessionStatus::Processing {
                    None
                } else {
                    s.status = SessionStatus::Processing;
                    s.query_seq += 1;
                    Some((s.session_id.clone(), s.query_seq))
                }
            })
            .await;

        let (session_id, seq) = match admitted {
            None => return Err(SubmitError::UnknownSession),
            Some(None) => return Err(SubmitError::Busy),
            Some(Some(v)) => v,
        };

        self.surface
            .push_message(chat_id, ChatMessage::plain(Role::User, text));
        self.surface
            .set_indicator(chat_id, SessionStatus::Processing);

        if let Err(e) = self.client.submit_query(&session_id, text).await {
            warn!(chat_id, %session_id, error = %e, "query submission failed");
            self.registry
                .with_session(chat_id, |s| {
                    if s.query_seq == seq {
                        s.status = SessionStatus::Idle;
                    }
                })
                .await;
            self.surface.set_indicator(chat_id, SessionStatus::Idle);
            self.surface.push_message(
                chat_id,
                ChatMessage::plain(Role::System, format!("Failed to submit query: {e}")),
            );
            return Err(SubmitError::Backend(e));
        }

        debug!(chat_id, %session_id, seq, "query admitted");
        self.spawn_watchdog(chat_id, seq);
        Ok(())
    }

    /// Host-facing handler for every user-submitted message in a research
    /// chat. Surfaces admission conflicts; drops messages for unknown
    /// sessions (deletion race).
    pub async fn handle_user_message(&self, chat_id: &str, text: &str) {
        match self.submit(chat_id, text).await {
            Ok(()) => {}
            Err(SubmitError::Busy) => {
                self.surface
                    .push_message(chat_id, ChatMessage::plain(Role::System, BUSY_TEXT));
            }
            Err(SubmitError::UnknownSession) => {
                debug!(chat_id, "message for unknown session dropped");
            }
            // Already reverted and surfaced inside submit.
            Err(SubmitError::Backend(_)) => {}
        }
    }

    /// Open (or replace) the session's stream transport. Bumps the
    /// connection epoch and closes any prior connection first, so two
    /// listeners can never deliver duplicate events.
    async fn open_stream(&self, chat_id: &str) {
        let opened = self
            .registry
            .with_session(chat_id, |s| {
                s.epoch += 1;
                if let Some(prior) = s.stream.take() {
                    prior.close();
                }
                (s.session_id.clone(), s.epoch)
            })
            .await;
        let Some((session_id, epoch)) = opened else {
            return;
        };
        let Some(url) = stream::stream_url(&self.config.endpoint, &session_id) else {
            warn!(chat_id, endpoint = %self.config.endpoint, "cannot derive stream URL");
            return;
        };

        let handle = stream::open(
            StreamContext {
                registry: Arc::clone(&self.registry),
                surface: Arc::clone(&self.surface),
                chat_id: chat_id.to_string(),
                session_id,
                epoch,
            },
            url,
        );
        self.registry
            .with_session(chat_id, |s| {
                if s.epoch == epoch {
                    s.stream = Some(handle);
                } else {
                    handle.close();
                }
            })
            .await;
    }

    /// Arm the query watchdog: if no terminal event lands within the
    /// configured timeout, synthesize a local error so the session never
    /// sticks in processing. The query sequence number keeps a stale
    /// watchdog from firing after a later query was admitted.
    fn spawn_watchdog(&self, chat_id: &str, seq: u64) {
        let Some(timeout) = self.config.query_timeout else {
            return;
        };
        let registry = Arc::clone(&self.registry);
        let surface = Arc::clone(&self.surface);
        let chat_id = chat_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let stuck = registry
                .with_session(&chat_id, |s| {
                    s.status == SessionStatus::Processing && s.query_seq == seq
                })
                .await
                .unwrap_or(false);
            if !stuck {
                return;
            }
            warn!(chat_id, seq, "query watchdog fired, synthesizing local error");
            dispatch::apply_event(
                &registry,
                surface.as_ref(),
                &chat_id,
                StreamEvent::ResearchError(ResearchFailure {
                    error: format!(
                        "no response from the backend within {}s",
                        timeout.as_secs()
                    ),
                    process_time: timeout.as_secs_f64(),
                }),
            )
            .await;
        });
    }
}
