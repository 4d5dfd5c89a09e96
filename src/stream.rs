//! Stream transport: one backend-to-client WebSocket per session.
//!
//! [`open`] spawns a read loop that connects to `/ws/{session_id}`, decodes
//! frames, and hands events to the dispatcher. On closure the loop
//! reconnects with capped exponential backoff plus jitter — but only while
//! the session is still registered and this connection's epoch is still
//! current. The controller bumps the epoch on every `open`, so a superseded
//! loop retires itself instead of delivering duplicate events.
//!
//! The channel is inbound-only: all client-to-backend requests go over HTTP.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::dispatch;
use crate::protocol;
use crate::registry::SessionRegistry;
use crate::surface::ChatSurface;

/// First reconnect delay; doubles per consecutive failure.
pub const RECONNECT_BASE: Duration = Duration::from_secs(5);
/// Ceiling on the reconnect delay (before jitter).
pub const RECONNECT_CAP: Duration = Duration::from_secs(60);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Owning handle to a session's stream read loop.
///
/// Dropping the handle aborts the loop, so replacing a session's connection
/// can never leave two live listeners behind.
pub struct StreamHandle {
    epoch: u64,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// The connection epoch this handle was opened with.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Stop the read loop. Idempotent; dropping the handle does the same.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Everything the read loop needs to deliver events for one session.
pub(crate) struct StreamContext {
    pub registry: Arc<SessionRegistry>,
    pub surface: Arc<dyn ChatSurface>,
    pub chat_id: String,
    pub session_id: String,
    /// Epoch captured at open time; checked before every reconnect.
    pub epoch: u64,
}

/// Spawn the read loop for a session and return its owning handle.
pub(crate) fn open(ctx: StreamContext, url: String) -> StreamHandle {
    let epoch = ctx.epoch;
    let task = tokio::spawn(run_loop(ctx, url));
    StreamHandle { epoch, task }
}

/// Derive the stream URL from the HTTP base URL (http→ws, https→wss).
pub fn stream_url(base_url: &str, session_id: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return None;
    };
    Some(format!("{ws_base}/ws/{session_id}"))
}

/// Connect, read until closure, back off, re-check liveness, repeat.
async fn run_loop(ctx: StreamContext, url: String) {
    let mut attempt: u32 = 0;
    loop {
        match tokio_tungstenite::connect_async(&url).await {
            Ok((ws, _)) => {
                info!(
                    chat_id = %ctx.chat_id,
                    session_id = %ctx.session_id,
                    "stream connected"
                );
                attempt = 0;
                read_frames(ws, &ctx).await;
                info!(chat_id = %ctx.chat_id, "stream closed");
            }
            Err(e) => {
                warn!(chat_id = %ctx.chat_id, error = %e, "stream connect failed");
            }
        }

        let delay = backoff_delay(attempt);
        attempt = attempt.saturating_add(1);
        tokio::time::sleep(delay).await;

        if !ctx
            .registry
            .epoch_is_current(&ctx.chat_id, ctx.epoch)
            .await
        {
            debug!(
                chat_id = %ctx.chat_id,
                epoch = ctx.epoch,
                "session gone or connection superseded, not reconnecting"
            );
            return;
        }
    }
}

/// Read frames until the peer closes or the stream ends. Read errors are
/// logged and skipped — only the transport's own close signal ends the
/// connection.
async fn read_frames(mut ws: WsStream, ctx: &StreamContext) {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => match protocol::decode(&text) {
                Some(event) => {
                    dispatch::apply_event(&ctx.registry, ctx.surface.as_ref(), &ctx.chat_id, event)
                        .await;
                }
                None => {
                    debug!(chat_id = %ctx.chat_id, "discarding malformed frame");
                }
            },
            Ok(Message::Close(_)) => return,
            Ok(_) => {} // ping/pong/binary
            Err(e) => {
                warn!(chat_id = %ctx.chat_id, error = %e, "stream read error");
            }
        }
    }
}

/// Exponential backoff from [`RECONNECT_BASE`], capped at [`RECONNECT_CAP`],
/// with up to 25% random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = (RECONNECT_BASE.as_secs() << attempt.min(4)).min(RECONNECT_CAP.as_secs());
    let jitter_ms = rand::thread_rng().gen_range(0..=secs * 250);
    Duration::from_secs(secs) + Duration::from_millis(jitter_ms)
}
