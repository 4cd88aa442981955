//! Per-socket read/write loop.
//!
//! Sends the snapshot, then forwards inbound frames to the relay worker
//! and bus events to the client until either side goes away. A receiver
//! that lags behind the bus is resubscribed and the client's map patched
//! from a fresh snapshot.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::client_view::ClientView;
use super::messages::{encode_event, parse_frame};
use crate::domain::{ConnectionId, RelayEvent};
use crate::error::RelayError;
use crate::service::{RelayHandle, Subscription};

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, relay: RelayHandle) {
    let connection = ConnectionId::new();
    let Subscription {
        snapshot,
        mut events,
    } = match relay.connect(connection).await {
        Ok(sub) => sub,
        Err(e) => {
            tracing::warn!(%connection, error = %e, "cannot accept connection");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut view = ClientView::new();
    let initial = snapshot.into_iter().map(RelayEvent::Position).collect();
    if send_events(&mut ws_tx, &mut view, initial).await {
        loop {
            tokio::select! {
                // Incoming message from client
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = handle_text_message(&text, connection, &relay).await {
                                tracing::warn!(%connection, error = %e, "relay unavailable");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            tracing::debug!(%connection, error = %e, "ws read failed");
                            break;
                        }
                        _ => {}
                    }
                }
                // Event from EventBus
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            if !send_events(&mut ws_tx, &mut view, vec![event]).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(%connection, lagged = n, "ws client lagged behind event bus");
                            let fresh = match relay.resync(connection).await {
                                Ok(sub) => sub,
                                Err(e) => {
                                    tracing::warn!(%connection, error = %e, "relay unavailable");
                                    break;
                                }
                            };
                            events = fresh.events;
                            let frames = view.resync(fresh.snapshot);
                            if !send_events(&mut ws_tx, &mut view, frames).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    if let Err(e) = relay.disconnect(connection).await {
        tracing::warn!(%connection, error = %e, "disconnect not recorded");
    }
    tracing::debug!(%connection, "ws connection closed");
}

/// Sends `batch` in order, recording each in `view`. Returns `false`
/// once the socket refuses a frame.
async fn send_events(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    view: &mut ClientView,
    batch: Vec<RelayEvent>,
) -> bool {
    for event in batch {
        let Ok(json) = encode_event(&event) else {
            continue;
        };
        if ws_tx.send(Message::text(json)).await.is_err() {
            return false;
        }
        view.observe(&event);
    }
    true
}

/// Parses a text frame and queues it on the relay. Frames that fail
/// parsing are dropped; only a stopped worker is reported as an error.
async fn handle_text_message(
    text: &str,
    connection: ConnectionId,
    relay: &RelayHandle,
) -> Result<(), RelayError> {
    match parse_frame(text) {
        Ok(inbound) => relay.submit(connection, inbound).await,
        Err(e) => {
            tracing::debug!(%connection, error = %e, "frame dropped");
            Ok(())
        }
    }
}
