use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    notify::NotificationService,
    routes::items::fetch_item_row,
    routes::models::{
        Conversation, ConversationResponse, ConversationSummary, ConversationsResponse,
        CreateMessageRequest, Message, MessageResponse, MessagesResponse,
    },
    util::require_bearer,
    ApiError, AppState,
};

// Open (or return the existing) thread between the caller and the item owner.
pub async fn open_conversation(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ConversationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let item = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if item.status == "deleted" {
        return Err(ApiError::not_found("Item not found"));
    }
    if item.owner_user_id == user.id {
        return Err(ApiError::bad_request(
            "Cannot open a conversation with yourself",
        ));
    }

    // One thread per item and inquirer; repeat calls return the same row.
    if let Some(existing) = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, public_id, item_id, starter_user_id, owner_user_id, created_at, updated_at
        FROM conversations
        WHERE item_id = ? AND starter_user_id = ?
        "#,
    )
    .bind(item.id)
    .bind(user.id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch conversation: {}", e);
        ApiError::internal_server_error("Failed to fetch conversation")
    })? {
        return Ok(Json(ConversationResponse {
            conversation: existing,
        }));
    }

    let public_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO conversations (public_id, item_id, starter_user_id, owner_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(item.id)
    .bind(user.id)
    .bind(item.owner_user_id)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create conversation: {}", e);
        ApiError::internal_server_error("Failed to create conversation")
    })?;

    let conversation = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, public_id, item_id, starter_user_id, owner_user_id, created_at, updated_at
        FROM conversations
        WHERE public_id = ?
        "#,
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch created conversation: {}", e);
        ApiError::internal_server_error("Failed to fetch created conversation")
    })?;

    Ok(Json(ConversationResponse { conversation }))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ConversationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let conversations = sqlx::query_as::<_, ConversationSummary>(
        r#"
        SELECT c.id, c.public_id, i.public_id AS item_public_id, i.title AS item_title,
               c.starter_user_id, c.owner_user_id, c.created_at, c.updated_at
        FROM conversations c
        JOIN items i ON i.id = c.item_id
        WHERE c.starter_user_id = ? OR c.owner_user_id = ?
        ORDER BY c.updated_at DESC
        "#,
    )
    .bind(user.id)
    .bind(user.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch conversations: {}", e);
        ApiError::internal_server_error("Failed to fetch conversations")
    })?;

    Ok(Json(ConversationsResponse { conversations }))
}

struct ConversationRow {
    id: i64,
    starter_user_id: i64,
    owner_user_id: i64,
    item_title: String,
}

async fn require_participant(
    state: &AppState,
    conversation_id: &str,
    user_id: i64,
) -> Result<ConversationRow, ApiError> {
    let row: Option<(i64, i64, i64, String)> = sqlx::query_as(
        r#"
        SELECT c.id, c.starter_user_id, c.owner_user_id, i.title
        FROM conversations c
        JOIN items i ON i.id = c.item_id
        WHERE c.public_id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch conversation: {}", e);
        ApiError::internal_server_error("Failed to fetch conversation")
    })?;

    let (id, starter_user_id, owner_user_id, item_title) =
        row.ok_or_else(|| ApiError::not_found("Conversation not found"))?;

    if starter_user_id != user_id && owner_user_id != user_id {
        return Err(ApiError::forbidden(
            "Not a participant of this conversation",
        ));
    }

    Ok(ConversationRow {
        id,
        starter_user_id,
        owner_user_id,
        item_title,
    })
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MessagesResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let conversation = require_participant(&state, &conversation_id, user.id).await?;

    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, public_id, conversation_id, sender_user_id, content, created_at
        FROM messages
        WHERE conversation_id = ?
        ORDER BY created_at ASC
        "#,
    )
    .bind(conversation.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch messages: {}", e);
        ApiError::internal_server_error("Failed to fetch messages")
    })?;

    Ok(Json(MessagesResponse { messages }))
}

pub async fn create_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let conversation = require_participant(&state, &conversation_id, user.id).await?;

    let public_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO messages (public_id, conversation_id, sender_user_id, content, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(conversation.id)
    .bind(user.id)
    .bind(&req.content)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create message: {}", e);
        ApiError::internal_server_error("Failed to create message")
    })?;

    sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(conversation.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to touch conversation: {}", e);
            ApiError::internal_server_error("Failed to touch conversation")
        })?;

    let recipient = if conversation.starter_user_id == user.id {
        conversation.owner_user_id
    } else {
        conversation.starter_user_id
    };
    let sender_name = user
        .display_name
        .clone()
        .or(user.email.clone())
        .unwrap_or_else(|| "A user".to_string());
    NotificationService::notify_new_message(
        state.db_pool(),
        recipient,
        &sender_name,
        &conversation.item_title,
    )
    .await?;

    let message = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, public_id, conversation_id, sender_user_id, content, created_at
        FROM messages
        WHERE public_id = ?
        "#,
    )
    .bind(&public_id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch created message: {}", e);
        ApiError::internal_server_error("Failed to fetch created message")
    })?;

    Ok(Json(MessageResponse { message }))
}
