//! Wire protocol for the backend event stream.
//!
//! Inbound frames are UTF-8 JSON objects `{"event": <kind>, "data": <object>}`;
//! `data` is optional and defaults to an empty object. [`decode`] turns a raw
//! frame into a [`StreamEvent`] — a closed sum type with one typed payload per
//! event kind. Unrecognized kinds decode to [`StreamEvent::Unknown`] so newer
//! backends never break older clients; malformed frames decode to `None` and
//! are discarded by the transport.
//!
//! No frames are ever sent client-to-backend on this channel — queries go
//! over HTTP (see [`crate::client`]).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Raw frame shape, before the event kind is interpreted.
#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// One decoded backend event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The backend started working on a query.
    ResearchStart,
    /// A streamed fragment of the answer under construction.
    Token(TokenData),
    /// The agent invoked a tool.
    ToolStart(ToolStartData),
    /// A tool returned output.
    ToolEnd(ToolEndData),
    /// Terminal: the query finished with a result.
    ResearchComplete(ResearchResponse),
    /// Terminal: the query failed backend-side.
    ResearchError(ResearchFailure),
    /// Buffered session history, delivered on connect/reconnect.
    SessionState(SessionState),
    /// Forward-compatible no-op for kinds this client does not know.
    Unknown { kind: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenData {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolStartData {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolEndData {
    #[serde(default)]
    pub output: String,
}

/// `research_complete` payload: `data.response` from the backend agent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: String,
    /// Elapsed research time in fractional seconds.
    #[serde(default)]
    pub process_time: f64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub provider: String,
}

/// `research_error` payload: `data.error` from the backend agent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResearchFailure {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub process_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct CompleteData {
    #[serde(default)]
    response: ResearchResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct ErrorData {
    #[serde(default)]
    error: ResearchFailure,
}

/// `session_state` payload: the backend's session snapshot. Only the
/// message history is replayed client-side.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub messages: Vec<ReplayMessage>,
}

/// One buffered message replayed from the backend's history.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplayMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Decode one raw text frame. Returns `None` for anything malformed —
/// unparseable JSON, a missing `event` tag, or a payload that does not
/// match its kind's shape.
pub fn decode(text: &str) -> Option<StreamEvent> {
    let frame: Frame = serde_json::from_str(text).ok()?;
    let data = frame.data;

    let event = match frame.event.as_str() {
        "research_start" => StreamEvent::ResearchStart,
        "token" => StreamEvent::Token(payload(data)?),
        "tool_start" => StreamEvent::ToolStart(payload(data)?),
        "tool_end" => StreamEvent::ToolEnd(payload(data)?),
        "research_complete" => {
            let data: CompleteData = payload(data)?;
            StreamEvent::ResearchComplete(data.response)
        }
        "research_error" => {
            let data: ErrorData = payload(data)?;
            StreamEvent::ResearchError(data.error)
        }
        "session_state" => StreamEvent::SessionState(payload(data)?),
        _ => StreamEvent::Unknown { kind: frame.event },
    };
    Some(event)
}

/// Deserialize an event payload, treating an absent/null `data` as empty.
fn payload<T: DeserializeOwned + Default>(data: Value) -> Option<T> {
    if data.is_null() {
        Some(T::default())
    } else {
        serde_json::from_value(data).ok()
    }
}

/// Render a fractional-seconds duration the way message metadata expects it.
pub fn format_process_time(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}
