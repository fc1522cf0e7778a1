//! Rotation progress WebSocket
//!
//! Streams every [`RotationEvent`] published by the rotation service to the
//! connected client as JSON text frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::WS_BUFFER_SIZE;
use crate::api::server::AppState;
use crate::services::RotationEvent;

pub async fn rotations_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_rotations_ws(socket, state))
}

async fn handle_rotations_ws(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<RotationEvent>(WS_BUFFER_SIZE);
    let mut events = state.service.subscribe();

    info!("Rotation WebSocket connected");

    let mut forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if tx.try_send(event).is_err() {
                        debug!("Rotation WebSocket buffer full, dropping event");
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Rotation WebSocket lagged, missed {} events", n);
                }
                Err(RecvError::Closed) => {
                    debug!("Rotation event channel closed");
                    break;
                }
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize rotation event: {}", e),
            }
        }
    });

    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("Rotation WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => debug!("Forward task ended"),
        _ = &mut send_task => debug!("Send task ended"),
        _ = &mut receive_task => debug!("Receive task ended"),
    }

    // the survivors would otherwise hold the subscription open
    forward_task.abort();
    send_task.abort();
    receive_task.abort();

    info!("Rotation WebSocket disconnected");
}
