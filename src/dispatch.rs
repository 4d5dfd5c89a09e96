//! Event dispatcher: maps decoded stream events to UI mutations.
//!
//! This is a fixed mapping table over the closed set of event kinds in
//! [`crate::protocol`], not a general interpreter. Events for a chat with no
//! registry entry are dropped silently — the session was deleted after the
//! backend produced the event, a benign race.

use tracing::debug;

use crate::protocol::{format_process_time, StreamEvent};
use crate::registry::{SessionRegistry, SessionStatus};
use crate::surface::{ChatMessage, ChatSurface, MessageMeta, Role};

/// Metadata shown on the in-progress placeholder, before the backend
/// reports which model actually answered.
pub const PLACEHOLDER_MODEL: &str = "DeepSeek-R1";
pub const PLACEHOLDER_PROVIDER: &str = "Groq/Ollama";

/// Text of the placeholder assistant message emitted on `research_start`.
pub const IN_PROGRESS_TEXT: &str = "Researching...";

/// Apply one inbound event to the session's UI state.
pub async fn apply_event(
    registry: &SessionRegistry,
    surface: &dyn ChatSurface,
    chat_id: &str,
    event: StreamEvent,
) {
    if !registry.contains(chat_id).await {
        debug!(chat_id, "dropping event for unknown session");
        return;
    }

    match event {
        StreamEvent::ResearchStart => {
            registry
                .with_session(chat_id, |s| s.status = SessionStatus::Processing)
                .await;
            surface.set_indicator(chat_id, SessionStatus::Processing);
            surface.push_message(
                chat_id,
                ChatMessage::streaming(
                    IN_PROGRESS_TEXT,
                    MessageMeta {
                        model: Some(PLACEHOLDER_MODEL.to_string()),
                        provider: Some(PLACEHOLDER_PROVIDER.to_string()),
                        ..MessageMeta::default()
                    },
                ),
            );
        }
        StreamEvent::Token(data) => {
            surface.append_to_last_assistant(chat_id, &data.token);
        }
        StreamEvent::ToolStart(data) => {
            surface.push_message(
                chat_id,
                ChatMessage::plain(
                    Role::Thinking,
                    format!("Using {}: {}", data.tool, data.input),
                ),
            );
        }
        StreamEvent::ToolEnd(data) => {
            surface.push_message(
                chat_id,
                ChatMessage::plain(Role::Thinking, format!("Tool output: {}", data.output)),
            );
        }
        StreamEvent::ResearchComplete(response) => {
            registry
                .with_session(chat_id, |s| s.status = SessionStatus::Idle)
                .await;
            surface.replace_last_assistant(
                chat_id,
                response.result,
                MessageMeta {
                    model: Some(response.model),
                    provider: Some(response.provider),
                    process_time: Some(format_process_time(response.process_time)),
                    error: false,
                },
            );
            surface.set_indicator(chat_id, SessionStatus::Idle);
        }
        StreamEvent::ResearchError(failure) => {
            registry
                .with_session(chat_id, |s| s.status = SessionStatus::Idle)
                .await;
            surface.replace_last_assistant(
                chat_id,
                format!("Research failed: {}", failure.error),
                MessageMeta {
                    process_time: Some(format_process_time(failure.process_time)),
                    error: true,
                    ..MessageMeta::default()
                },
            );
            surface.set_indicator(chat_id, SessionStatus::Idle);
        }
        StreamEvent::SessionState(state) => {
            // Replay buffered history in its original order. Roles other
            // than user/assistant are backend-internal and not replayed.
            for message in state.messages {
                let role = match message.role.as_str() {
                    "user" => Role::User,
                    "assistant" => Role::Assistant,
                    _ => continue,
                };
                surface.push_message(chat_id, ChatMessage::plain(role, message.content));
            }
        }
        StreamEvent::Unknown { kind } => {
            debug!(chat_id, %kind, "ignoring unknown event kind");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        ReplayMessage, ResearchFailure, ResearchResponse, SessionState, TokenData,
    };
    use crate::registry::SessionRegistry;
    use crate::testing::RecordingSurface;

    async fn setup() -> (std::sync::Arc<SessionRegistry>, std::sync::Arc<RecordingSurface>) {
        crate::testing::init_tracing();
        let registry = SessionRegistry::new();
        registry.create("c1", "s1").await;
        (registry, RecordingSurface::new())
    }

    #[tokio::test]
    async fn research_start_marks_processing_and_emits_placeholder() {
        let (registry, surface) = setup().await;

        apply_event(&registry, surface.as_ref(), "c1", StreamEvent::ResearchStart).await;

        assert_eq!(
            registry.status("c1").await,
            Some(SessionStatus::Processing)
        );
        let messages = surface.messages("c1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, IN_PROGRESS_TEXT);
        assert!(!messages[0].done);
        assert_eq!(messages[0].meta.model.as_deref(), Some(PLACEHOLDER_MODEL));
        assert_eq!(
            messages[0].meta.provider.as_deref(),
            Some(PLACEHOLDER_PROVIDER)
        );
        assert_eq!(
            surface.last_indicator("c1"),
            Some(SessionStatus::Processing)
        );
    }

    #[tokio::test]
    async fn tokens_accumulate_into_last_assistant_message() {
        let (registry, surface) = setup().await;

        apply_event(&registry, surface.as_ref(), "c1", StreamEvent::ResearchStart).await;
        for token in ["Hel", "lo"] {
            apply_event(
                &registry,
                surface.as_ref(),
                "c1",
                StreamEvent::Token(TokenData {
                    token: token.into(),
                }),
            )
            .await;
        }

        let messages = surface.messages("c1");
        let last = messages.last().unwrap();
        assert_eq!(last.content, format!("{IN_PROGRESS_TEXT}Hello"));
        assert!(!last.done);
    }

    #[tokio::test]
    async fn complete_finalizes_message_and_returns_to_idle() {
        let (registry, surface) = setup().await;

        apply_event(&registry, surface.as_ref(), "c1", StreamEvent::ResearchStart).await;
        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::ResearchComplete(ResearchResponse {
                success: true,
                result: "Answer.".into(),
                process_time: 1.234,
                model: "m".into(),
                provider: "p".into(),
            }),
        )
        .await;

        assert_eq!(registry.status("c1").await, Some(SessionStatus::Idle));
        let messages = surface.messages("c1");
        let last = messages.last().unwrap();
        assert_eq!(last.content, "Answer.");
        assert!(last.done);
        assert_eq!(last.meta.process_time.as_deref(), Some("1.23s"));
        assert_eq!(last.meta.model.as_deref(), Some("m"));
        assert!(!last.meta.error);
        assert_eq!(surface.last_indicator("c1"), Some(SessionStatus::Idle));
    }

    #[tokio::test]
    async fn error_finalizes_message_with_error_flag() {
        let (registry, surface) = setup().await;

        apply_event(&registry, surface.as_ref(), "c1", StreamEvent::ResearchStart).await;
        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::ResearchError(ResearchFailure {
                error: "rate limited".into(),
                process_time: 0.5,
            }),
        )
        .await;

        assert_eq!(registry.status("c1").await, Some(SessionStatus::Idle));
        let messages = surface.messages("c1");
        let last = messages.last().unwrap();
        assert!(last.done);
        assert!(last.meta.error);
        assert!(last.content.contains("rate limited"));
    }

    #[tokio::test]
    async fn tool_events_emit_thinking_messages() {
        let (registry, surface) = setup().await;

        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::ToolStart(crate::protocol::ToolStartData {
                tool: "web_search".into(),
                input: "rust".into(),
            }),
        )
        .await;
        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::ToolEnd(crate::protocol::ToolEndData {
                output: "3 results".into(),
            }),
        )
        .await;

        let messages = surface.messages("c1");
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.role == Role::Thinking));
        assert!(messages[0].content.contains("web_search"));
        assert!(messages[1].content.contains("3 results"));
    }

    #[tokio::test]
    async fn session_state_replays_history_in_order() {
        let (registry, surface) = setup().await;

        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::SessionState(SessionState {
                messages: vec![
                    ReplayMessage {
                        role: "user".into(),
                        content: "q1".into(),
                        timestamp: String::new(),
                    },
                    ReplayMessage {
                        role: "system".into(),
                        content: "internal".into(),
                        timestamp: String::new(),
                    },
                    ReplayMessage {
                        role: "assistant".into(),
                        content: "a1".into(),
                        timestamp: String::new(),
                    },
                ],
            }),
        )
        .await;

        let messages = surface.messages("c1");
        assert_eq!(messages.len(), 2);
        assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "q1"));
        assert_eq!(
            (messages[1].role, messages[1].content.as_str()),
            (Role::Assistant, "a1")
        );
        assert!(messages.iter().all(|m| m.done));
    }

    #[tokio::test]
    async fn events_for_unknown_sessions_are_dropped() {
        let registry = SessionRegistry::new();
        let surface = RecordingSurface::new();

        apply_event(
            &registry,
            surface.as_ref(),
            "ghost",
            StreamEvent::ResearchStart,
        )
        .await;

        assert!(surface.messages("ghost").is_empty());
        assert_eq!(surface.last_indicator("ghost"), None);
    }

    #[tokio::test]
    async fn unknown_kinds_are_noops() {
        let (registry, surface) = setup().await;

        apply_event(
            &registry,
            surface.as_ref(),
            "c1",
            StreamEvent::Unknown {
                kind: "search_progress".into(),
            },
        )
        .await;

        assert!(surface.messages("c1").is_empty());
        assert_eq!(registry.status("c1").await, Some(SessionStatus::Idle));
    }
}
