//! WebSocket stream of relationship events for the connected user

use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use kinship::models::UserId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{api::auth::AuthContext, state::AppState};

/// WebSocket message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WebSocketMessage {
    /// Connection established
    Connected {
        connection_id: String,
        user_id: String,
    },

    /// A relationship involving the connected user changed
    RelationshipChanged {
        actor: String,
        counterpart: String,
        outcome: String,
    },

    /// Ping message for keepalive
    Ping,

    /// Pong response
    Pong,

    /// Error message
    Error {
        message: String,
        code: Option<String>,
    },
}

/// Handle WebSocket upgrade
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, auth.user_id))
}

/// Handle individual WebSocket connection
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let connection_id = Uuid::new_v4();
    info!(user = %user_id, "WebSocket connection established: {}", connection_id);

    let (tx, mut rx) = broadcast::channel(100);
    state.add_websocket_connection(connection_id, user_id.clone(), tx.clone());

    let (mut sender, mut receiver) = socket.split();

    let connect_msg = WebSocketMessage::Connected {
        connection_id: connection_id.to_string(),
        user_id: user_id.to_string(),
    };

    if let Ok(msg_text) = serde_json::to_string(&connect_msg)
        && sender.send(Message::Text(msg_text.into())).await.is_err()
    {
        warn!("Failed to send connection message to {}", connection_id);
        state.remove_websocket_connection(&connection_id);
        return;
    }

    let incoming_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!("Received WebSocket message from {}: {}", connection_id, text);

                    match serde_json::from_str::<WebSocketMessage>(&text) {
                        Ok(WebSocketMessage::Ping) => {
                            let _ = tx.send(WebSocketMessage::Pong);
                        }
                        Ok(_) => {
                            debug!("Ignoring client message from {}", connection_id);
                        }
                        Err(e) => {
                            let _ = tx.send(WebSocketMessage::Error {
                                message: format!("Unrecognised message: {}", e),
                                code: Some("invalid_message".to_string()),
                            });
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket connection closed by client: {}", connection_id);
                    break;
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    break;
                }
                _ => {}
            }
        }
    });

    let outgoing_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ws_msg) => {
                    if let Ok(msg_text) = serde_json::to_string(&ws_msg)
                        && sender.send(Message::Text(msg_text.into())).await.is_err()
                    {
                        error!("Failed to send message to WebSocket {}", connection_id);
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Connection channel closed for {}", connection_id);
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket {} lagged behind its event channel", connection_id);
                }
            }
        }
    });

    tokio::select! {
        _ = incoming_task => {
            debug!("Incoming task completed for {}", connection_id);
        }
        _ = outgoing_task => {
            debug!("Outgoing task completed for {}", connection_id);
        }
    }

    state.remove_websocket_connection(&connection_id);
    info!("WebSocket connection closed: {}", connection_id);
}
