//! WebSocket push channel for timer viewers

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    protocol::{ClientMessage, JoinExam, ServerMessage},
    services::ConnectionId,
    state::AppState,
};

/// Handle GET /ws - Upgrade to the viewer push channel
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let connection = state.audiences.register(tx);
    info!("WebSocket connected: {}", connection);

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize message for {}: {}", connection, e);
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(json)).await {
                    warn!("Socket send error: {} err={}", connection, e);
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_client_message(&state, connection, &text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {} err={}", connection, e);
                        break;
                    }
                }
            }
        }
    }

    state.audiences.disconnect(connection);
    info!("WebSocket disconnected: {}", connection);
}

fn handle_client_message(state: &AppState, connection: ConnectionId, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::JoinExam(join)) => join_exam(state, connection, join),
        Err(e) => warn!("Ignoring malformed message from {}: {}", connection, e),
    }
}

fn join_exam(state: &AppState, connection: ConnectionId, join: JoinExam) {
    if join.exam_id.is_empty() {
        debug!("Ignoring join without exam id from {}", connection);
        return;
    }

    state.initialize_from_catalog(&join.exam_id);
    let viewer_id = join.user_id.filter(|id| !id.is_empty());
    state.engine.snapshot_with(&join.exam_id, |snapshot| {
        state.audiences.join(connection, viewer_id, snapshot)
    });
}
