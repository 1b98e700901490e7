//! Live viewer channel.
//!
//! One WebSocket per dashboard viewer. The client steers its device focus
//! with JSON text frames (`{"action":"join","deviceId":"X"}` /
//! `{"action":"leave","deviceId":"X"}`); the server forwards each
//! published [`LiveEvent`] for the joined device as a JSON text frame.
//! Last join wins, so a viewer switches devices without reconnecting.
//! Socket close or a failed send tears the session out of the bus.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::debug;

use muster_bus::EventBus;
use muster_core::{DeviceId, SessionId};

use super::AppState;

/// Commands a viewer session may send down the socket.
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ViewerCommand {
    /// Focus on a device's events, leaving any previous focus.
    Join {
        #[serde(rename = "deviceId")]
        device_id: DeviceId,
    },
    /// Drop focus on a device.
    Leave {
        #[serde(rename = "deviceId")]
        device_id: DeviceId,
    },
}

/// `GET /api/live` -- upgrade to the live viewer WebSocket.
pub async fn live(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, state.bus))
}

async fn handle_session(socket: WebSocket, bus: Arc<EventBus>) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let session = bus.connect(events_tx);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                // The bus dropped us; nothing more will arrive.
                let Some(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else { continue };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        apply_command(&bus, session, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered at the protocol layer; binary
                    // frames have no meaning on this channel.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(session = %session, error = %e, "live socket error");
                        break;
                    }
                }
            }
        }
    }

    bus.on_session_closed(session);
}

/// Parse and apply one steering frame. Malformed frames and empty device
/// identifiers are logged and ignored; they never tear down the session.
fn apply_command(bus: &EventBus, session: SessionId, text: &str) {
    match serde_json::from_str::<ViewerCommand>(text) {
        Ok(ViewerCommand::Join { device_id }) => {
            if !device_id.is_empty() {
                bus.subscribe(session, &device_id);
            }
        }
        Ok(ViewerCommand::Leave { device_id }) => {
            bus.unsubscribe(session, &device_id);
        }
        Err(e) => {
            debug!(session = %session, error = %e, "ignoring malformed live-channel frame");
        }
    }
}
