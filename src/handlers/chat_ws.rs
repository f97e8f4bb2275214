//! WebSocket handler for real-time chat
//!
//! One socket per participant per room. Inbound frames are dispatched on
//! their `type` field; outbound fan-out goes through the in-process
//! `ChatManager`, so delivery order is whatever the single process
//! produces. There is no reconnect or resume: a dropped socket simply
//! disappears from the room.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::models::chat::{MessageResponse, WsConnectQuery};
use crate::services::chat_manager::ConnectionId;
use crate::AppState;

use super::chat::{add_message, find_chat_by_id, mark_messages_read};

/// Policy close code for protocol violations (unknown chat)
const CLOSE_POLICY: u16 = 1008;

const MAX_MESSAGE_LENGTH: usize = 2000;

/// Inbound frame from the client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Persist and fan out a chat message
    Message {
        message_text: String,
        #[serde(default)]
        sender_is_registered: bool,
    },
    /// Mark the peer's messages as read
    Read,
    /// Ephemeral typing indicator, never persisted
    Typing {
        #[serde(default)]
        is_typing: bool,
    },
}

/// Outbound frame to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Presence snapshot sent to a connection right after it joins
    OnlineUsers { users: Vec<String> },
    Message { message: MessageResponse },
    MessagesRead { user_id: String, count: u64 },
    Typing { user_id: String, is_typing: bool },
    UserDisconnected { user_id: String },
    Error { message: String },
}

impl ServerMessage {
    fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// GET /api/chat/ws/{chat_id}?user_id=…
pub async fn chat_websocket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
    Query(query): Query<WsConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, chat_id, query.user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, chat_id: i32, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    // The room must exist before anyone may join it
    if find_chat_by_id(&state.db, chat_id).await.is_err() {
        warn!(chat_id = chat_id, "WebSocket join for unknown chat");
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_POLICY,
                reason: "Chat not found".into(),
            })))
            .await;
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let conn_id = state.chat_manager.connect(chat_id, &user_id, tx.clone());

    info!(chat_id = chat_id, user_id = %user_id, "Chat WebSocket connected");

    // Presence snapshot goes only to the joining connection
    let snapshot = ServerMessage::OnlineUsers {
        users: state.chat_manager.online_users(chat_id),
    };
    if sender
        .send(Message::Text(snapshot.to_frame().into()))
        .await
        .is_err()
    {
        state.chat_manager.disconnect(chat_id, conn_id);
        return;
    }

    // Writer: drain the room channel into this socket
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Reader: dispatch inbound frames until the socket goes away
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_message) => {
                        handle_client_message(&state, chat_id, &user_id, conn_id, &tx, client_message)
                            .await;
                    }
                    Err(e) => {
                        debug!(chat_id = chat_id, error = %e, "Unparseable chat frame");
                        let _ = tx.send(
                            ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            }
                            .to_frame(),
                        );
                    }
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Keepalive is answered by the protocol layer
            }
            Ok(Message::Close(_)) => {
                debug!(chat_id = chat_id, user_id = %user_id, "WebSocket closed by client");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(chat_id = chat_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.chat_manager.disconnect(chat_id, conn_id);
    drop(tx);
    let _ = writer.await;

    // Let the peer know the other side left
    state.chat_manager.broadcast(
        chat_id,
        &ServerMessage::UserDisconnected {
            user_id: user_id.clone(),
        }
        .to_frame(),
        None,
    );

    info!(chat_id = chat_id, user_id = %user_id, "Chat WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    chat_id: i32,
    user_id: &str,
    conn_id: ConnectionId,
    tx: &mpsc::UnboundedSender<String>,
    client_message: ClientMessage,
) {
    match client_message {
        ClientMessage::Message {
            message_text,
            sender_is_registered,
        } => {
            if message_text.is_empty() || message_text.len() > MAX_MESSAGE_LENGTH {
                let _ = tx.send(
                    ServerMessage::Error {
                        message: format!(
                            "Message must be between 1 and {} characters",
                            MAX_MESSAGE_LENGTH
                        ),
                    }
                    .to_frame(),
                );
                return;
            }

            match add_message(&state.db, chat_id, user_id, sender_is_registered, &message_text)
                .await
            {
                Ok(message) => {
                    // Everyone in the room sees the stored message, the
                    // sender included, so all clients render the same row
                    state.chat_manager.broadcast(
                        chat_id,
                        &ServerMessage::Message {
                            message: message.into(),
                        }
                        .to_frame(),
                        None,
                    );
                }
                Err(e) => {
                    error!(chat_id = chat_id, error = %e, "Failed to store chat message");
                    let _ = tx.send(
                        ServerMessage::Error {
                            message: "Failed to store message".to_string(),
                        }
                        .to_frame(),
                    );
                }
            }
        }
        ClientMessage::Read => match mark_messages_read(&state.db, chat_id, user_id).await {
            Ok(count) => {
                state.chat_manager.broadcast(
                    chat_id,
                    &ServerMessage::MessagesRead {
                        user_id: user_id.to_string(),
                        count,
                    }
                    .to_frame(),
                    Some(conn_id),
                );
            }
            Err(e) => {
                error!(chat_id = chat_id, error = %e, "Failed to mark messages read");
            }
        },
        ClientMessage::Typing { is_typing } => {
            state.chat_manager.broadcast(
                chat_id,
                &ServerMessage::Typing {
                    user_id: user_id.to_string(),
                    is_typing,
                }
                .to_frame(),
                Some(conn_id),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parses_message() {
        let frame = r#"{"type":"message","message_text":"hi","sender_is_registered":true}"#;
        let parsed: ClientMessage = serde_json::from_str(frame).unwrap();
        match parsed {
            ClientMessage::Message {
                message_text,
                sender_is_registered,
            } => {
                assert_eq!(message_text, "hi");
                assert!(sender_is_registered);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_client_message_parses_read_and_typing() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"read"}"#).unwrap(),
            ClientMessage::Read
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"typing","is_typing":true}"#).unwrap(),
            ClientMessage::Typing { is_typing: true }
        ));
    }

    #[test]
    fn test_client_message_rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_server_message_frame_shape() {
        let frame = ServerMessage::Typing {
            user_id: "7".to_string(),
            is_typing: true,
        }
        .to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "typing");
        assert_eq!(value["user_id"], "7");
        assert_eq!(value["is_typing"], true);
    }

    #[test]
    fn test_online_users_frame_shape() {
        let frame = ServerMessage::OnlineUsers {
            users: vec!["7".to_string(), "anon-uuid".to_string()],
        }
        .to_frame();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "online_users");
        assert_eq!(value["users"].as_array().unwrap().len(), 2);
    }
}
