//! Chat REST handlers
//!
//! Rooms are keyed by (listing, buyer); a buyer id is either a stringified
//! user id or an anonymous UUID the frontend keeps per browser. The
//! WebSocket side reuses the persistence helpers defined here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;
use tracing::info;

use crate::entities::{chats, messages, prelude::*};
use crate::models::chat::{
    ChatCreateRequest, ChatResponse, ChatWithMessages, FindChatQuery, MarkReadQuery,
    MessageCreateRequest, MessageResponse, MessagesQuery, MyChatsQuery,
};
use crate::models::user::ErrorResponse;
use crate::AppState;

use super::{bad_request, db_error, not_found};

const DEFAULT_MESSAGE_PAGE: u64 = 100;
const MAX_MESSAGE_PAGE: u64 = 500;
const MAX_MESSAGE_LENGTH: usize = 2000;

/// POST /api/chat/chats - create a room (idempotent per listing+buyer)
pub async fn create_chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatCreateRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let chat = get_or_create_chat(
        &state.db,
        payload.listing_id,
        payload.seller_id,
        &payload.buyer_id,
        payload.buyer_is_registered,
    )
    .await
    .map_err(db_error)?;

    Ok(Json(ChatResponse::from_chat(chat)))
}

/// GET /api/chat/chats/find
pub async fn find_chat(
    State(state): State<AppState>,
    Query(query): Query<FindChatQuery>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let buyer_is_registered = query.buyer_id.parse::<i32>().is_ok();

    let chat = get_or_create_chat(
        &state.db,
        query.listing_id,
        query.seller_id,
        &query.buyer_id,
        buyer_is_registered,
    )
    .await
    .map_err(db_error)?;

    Ok(Json(ChatResponse::from_chat(chat)))
}

/// GET /api/chat/chats/my - rooms with unread counts and last message
pub async fn my_chats(
    State(state): State<AppState>,
    Query(query): Query<MyChatsQuery>,
) -> Result<Json<Vec<ChatResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let chats = user_chats(&state.db, &query.user_id, query.is_seller)
        .await
        .map_err(db_error)?;
    Ok(Json(chats))
}

/// GET /api/chat/chats/seller/{seller_id}/grouped - rooms keyed by listing
pub async fn seller_chats_grouped(
    State(state): State<AppState>,
    Path(seller_id): Path<i32>,
) -> Result<Json<HashMap<i32, Vec<ChatResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    let chats = user_chats(&state.db, &seller_id.to_string(), true)
        .await
        .map_err(db_error)?;

    let mut grouped: HashMap<i32, Vec<ChatResponse>> = HashMap::new();
    for chat in chats {
        grouped.entry(chat.listing_id).or_default().push(chat);
    }

    Ok(Json(grouped))
}

/// GET /api/chat/chats/{id}/info
pub async fn chat_info(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let chat = find_chat_by_id(&state.db, chat_id).await?;
    Ok(Json(ChatResponse::from_chat(chat)))
}

/// GET /api/chat/chats/{id} - room with its full message history
pub async fn chat_with_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
) -> Result<Json<ChatWithMessages>, (StatusCode, Json<ErrorResponse>)> {
    let chat = find_chat_by_id(&state.db, chat_id).await?;

    let messages = chat_messages(&state.db, chat_id, DEFAULT_MESSAGE_PAGE, 0)
        .await
        .map_err(db_error)?;

    Ok(Json(ChatWithMessages {
        chat: ChatResponse::from_chat(chat),
        messages,
    }))
}

/// GET /api/chat/chats/{id}/messages
pub async fn get_chat_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGE_PAGE)
        .clamp(1, MAX_MESSAGE_PAGE);
    let offset = query.offset.unwrap_or(0);

    let messages = chat_messages(&state.db, chat_id, limit, offset)
        .await
        .map_err(db_error)?;

    Ok(Json(messages))
}

/// POST /api/chat/chats/{id}/messages - REST fallback for sending
pub async fn post_message(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
    Json(payload): Json<MessageCreateRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    if payload.message_text.is_empty() {
        return Err(bad_request("Message cannot be empty"));
    }
    if payload.message_text.len() > MAX_MESSAGE_LENGTH {
        return Err(bad_request(format!(
            "Message cannot exceed {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }

    find_chat_by_id(&state.db, chat_id).await?;

    let message = add_message(
        &state.db,
        chat_id,
        &payload.sender_id,
        payload.sender_is_registered,
        &payload.message_text,
    )
    .await
    .map_err(db_error)?;

    Ok(Json(message.into()))
}

/// POST /api/chat/chats/{id}/read?user_id=…
pub async fn mark_read(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
    Query(query): Query<MarkReadQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let count = mark_messages_read(&state.db, chat_id, &query.user_id)
        .await
        .map_err(db_error)?;

    Ok(Json(serde_json::json!({ "marked_as_read": count })))
}

/// DELETE /api/chat/chats/{id} - removes the room and its messages
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<i32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let chat = find_chat_by_id(&state.db, chat_id).await?;

    // Messages go first; the FK cascade also covers this but the explicit
    // order keeps the delete observable in the logs
    let deleted_messages = Messages::delete_many()
        .filter(messages::Column::ChatId.eq(chat_id))
        .exec(&state.db)
        .await
        .map_err(db_error)?;

    chat.into_active_model()
        .delete(&state.db)
        .await
        .map_err(db_error)?;

    info!(
        chat_id = chat_id,
        messages = deleted_messages.rows_affected,
        "Chat deleted"
    );

    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub(crate) async fn find_chat_by_id(
    db: &DatabaseConnection,
    chat_id: i32,
) -> Result<chats::Model, (StatusCode, Json<ErrorResponse>)> {
    Chats::find_by_id(chat_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Chat not found"))
}

pub(crate) async fn get_or_create_chat(
    db: &DatabaseConnection,
    listing_id: i32,
    seller_id: i32,
    buyer_id: &str,
    buyer_is_registered: bool,
) -> Result<chats::Model, sea_orm::DbErr> {
    let existing = Chats::find()
        .filter(chats::Column::ListingId.eq(listing_id))
        .filter(chats::Column::BuyerId.eq(buyer_id))
        .one(db)
        .await?;

    if let Some(chat) = existing {
        return Ok(chat);
    }

    let new_chat = chats::ActiveModel {
        listing_id: Set(listing_id),
        seller_id: Set(seller_id),
        buyer_id: Set(buyer_id.to_string()),
        buyer_is_registered: Set(buyer_is_registered),
        ..Default::default()
    };

    let chat = new_chat.insert(db).await?;
    info!(
        chat_id = chat.id,
        listing_id = listing_id,
        buyer_id = %buyer_id,
        "Chat created"
    );
    Ok(chat)
}

/// Store a message and bump the room's updated_at
pub(crate) async fn add_message(
    db: &DatabaseConnection,
    chat_id: i32,
    sender_id: &str,
    sender_is_registered: bool,
    message_text: &str,
) -> Result<messages::Model, sea_orm::DbErr> {
    let new_message = messages::ActiveModel {
        chat_id: Set(chat_id),
        sender_id: Set(sender_id.to_string()),
        sender_is_registered: Set(sender_is_registered),
        message_text: Set(message_text.to_string()),
        is_read: Set(false),
        ..Default::default()
    };

    let message = new_message.insert(db).await?;

    if let Some(chat) = Chats::find_by_id(chat_id).one(db).await? {
        let mut active_chat = chat.into_active_model();
        active_chat.updated_at = Set(Some(Utc::now().fixed_offset()));
        active_chat.update(db).await?;
    }

    Ok(message)
}

/// Mark every message in the room not sent by `user_id` as read
pub(crate) async fn mark_messages_read(
    db: &DatabaseConnection,
    chat_id: i32,
    user_id: &str,
) -> Result<u64, sea_orm::DbErr> {
    let result = Messages::update_many()
        .col_expr(messages::Column::IsRead, sea_orm::sea_query::Expr::value(true))
        .filter(messages::Column::ChatId.eq(chat_id))
        .filter(messages::Column::SenderId.ne(user_id))
        .filter(messages::Column::IsRead.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

async fn chat_messages(
    db: &DatabaseConnection,
    chat_id: i32,
    limit: u64,
    offset: u64,
) -> Result<Vec<MessageResponse>, sea_orm::DbErr> {
    let rows = Messages::find()
        .filter(messages::Column::ChatId.eq(chat_id))
        .order_by_asc(messages::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Rooms for a user with unread counts and last-message previews,
/// most recently active first
async fn user_chats(
    db: &DatabaseConnection,
    user_id: &str,
    is_seller: bool,
) -> Result<Vec<ChatResponse>, sea_orm::DbErr> {
    let rows = if is_seller {
        let Ok(seller_id) = user_id.parse::<i32>() else {
            return Ok(Vec::new());
        };
        Chats::find()
            .filter(chats::Column::SellerId.eq(seller_id))
            .all(db)
            .await?
    } else {
        Chats::find()
            .filter(chats::Column::BuyerId.eq(user_id))
            .all(db)
            .await?
    };

    let mut result = Vec::with_capacity(rows.len());
    for chat in rows {
        let last_message = Messages::find()
            .filter(messages::Column::ChatId.eq(chat.id))
            .order_by_desc(messages::Column::CreatedAt)
            .one(db)
            .await?;

        let unread_count = Messages::find()
            .filter(messages::Column::ChatId.eq(chat.id))
            .filter(messages::Column::IsRead.eq(false))
            .filter(messages::Column::SenderId.ne(user_id))
            .count(db)
            .await?;

        let mut response = ChatResponse::from_chat(chat);
        response.unread_count = unread_count;
        response.last_message = last_message.as_ref().map(|m| m.message_text.clone());
        response.last_message_time = last_message.and_then(|m| m.created_at);
        result.push(response);
    }

    result.sort_by(|a, b| {
        let a_time = a.last_message_time.or(a.created_at);
        let b_time = b.last_message_time.or(b.created_at);
        b_time.cmp(&a_time)
    });

    Ok(result)
}
