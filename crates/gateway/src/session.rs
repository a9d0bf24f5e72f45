//! WebSocket subscriber sessions
//!
//! Each session runs a read pump (control frames) and a write pump
//! (event multiplexing). The write pump owns the session lifetime: when
//! it exits, for any reason, the session is torn down and deregistered.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;

use diag_pipeline::SessionQueues;
use diag_protocol::{ClientFrame, EventFrame};

use crate::state::AppState;

/// Keepalive ping cadence
const PING_INTERVAL: Duration = Duration::from_millis(100);

/// GET /ws
pub(crate) async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// Drive one subscriber session to completion
async fn run_session(socket: WebSocket, state: AppState) {
    let (id, queues) = state.broadcaster.subscribe();
    tracing::info!(session_id = id, "subscriber connected");

    // Which log file this session wants streamed; empty = none
    let viewed_file = Arc::new(RwLock::new(String::new()));

    let (sink, stream) = socket.split();
    let reader = tokio::spawn(read_pump(stream, Arc::clone(&viewed_file), id));

    write_pump(sink, queues, viewed_file, state.cancel.clone(), id).await;

    // Whatever ended the write pump ends the session
    reader.abort();
    state.broadcaster.unsubscribe(id);
    tracing::info!(session_id = id, "subscriber disconnected");
}

/// Apply inbound control frames to session state
///
/// Unknown and malformed frames are ignored; the channel is one-way
/// enough that there is nothing useful to answer with.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    viewed_file: Arc<RwLock<String>>,
    session_id: u64,
) {
    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(_) => break,
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(ClientFrame::ViewFile(path)) => {
                tracing::debug!(session_id, file = %path, "view_file");
                *viewed_file.write() = path;
            }
            Ok(ClientFrame::SpeedControl(_)) => {
                // Reserved by the protocol; accepted and ignored
            }
            Ok(ClientFrame::Unknown) | Err(_) => {}
        }
    }
}

/// Multiplex the three event queues, the keepalive tick and shutdown
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut queues: SessionQueues,
    viewed_file: Arc<RwLock<String>>,
    cancel: tokio_util::sync::CancellationToken,
    session_id: u64,
) {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            Some(batch) = queues.packets.recv() => {
                if send_event(&mut sink, &EventFrame::Network(&batch)).await.is_err() {
                    break;
                }
            }

            Some(entry) = queues.logs.recv() => {
                // Per-session filter: only the currently viewed file
                let wanted = { viewed_file.read().clone() };
                if wanted.is_empty() || wanted != entry.filename {
                    continue;
                }
                if send_event(&mut sink, &EventFrame::Log(&entry)).await.is_err() {
                    break;
                }
            }

            Some(record) = queues.files.recv() => {
                if send_event(&mut sink, &EventFrame::FileUpdate(&record)).await.is_err() {
                    break;
                }
            }

            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    tracing::debug!(session_id, "keepalive failed, closing session");
                    break;
                }
            }
        }
    }
}

/// Serialize and send one event frame
async fn send_event(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &EventFrame<'_>,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sink.send(Message::Text(json.into())).await
}
