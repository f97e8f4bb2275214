use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::entities::{chats, messages};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCreateRequest {
    pub listing_id: i32,
    pub seller_id: i32,
    pub buyer_id: String,
    #[serde(default)]
    pub buyer_is_registered: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FindChatQuery {
    pub listing_id: i32,
    pub seller_id: i32,
    pub buyer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MyChatsQuery {
    pub user_id: String,
    #[serde(default)]
    pub is_seller: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkReadQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WsConnectQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreateRequest {
    pub message_text: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_is_registered: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: i32,
    pub chat_id: i32,
    pub sender_id: String,
    pub sender_is_registered: bool,
    pub message_text: String,
    pub is_read: bool,
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl From<messages::Model> for MessageResponse {
    fn from(message: messages::Model) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            sender_is_registered: message.sender_is_registered,
            message_text: message.message_text,
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub id: i32,
    pub listing_id: i32,
    pub seller_id: i32,
    pub buyer_id: String,
    pub buyer_is_registered: bool,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub updated_at: Option<DateTime<FixedOffset>>,
    pub unread_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<FixedOffset>>,
}

impl ChatResponse {
    pub fn from_chat(chat: chats::Model) -> Self {
        Self {
            id: chat.id,
            listing_id: chat.listing_id,
            seller_id: chat.seller_id,
            buyer_id: chat.buyer_id,
            buyer_is_registered: chat.buyer_is_registered,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
            unread_count: 0,
            last_message: None,
            last_message_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatWithMessages {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub messages: Vec<MessageResponse>,
}
