use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    routes::models::{
        MarkNotificationReadRequest, Notification, NotificationResponse, NotificationsResponse,
    },
    util::require_bearer,
    ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// Get user notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let unread_only = query.unread_only.unwrap_or(false);
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let notifications = if unread_only {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, title, body, read, created_at
            FROM notifications
            WHERE user_id = ? AND read = FALSE
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch unread notifications: {}", e);
            ApiError::internal_server_error("Failed to fetch notifications")
        })?
    } else {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, title, body, read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch notifications: {}", e);
            ApiError::internal_server_error("Failed to fetch notifications")
        })?
    };

    Ok(Json(NotificationsResponse { notifications }))
}

// Get unread notification count
pub async fn get_unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = FALSE",
    )
    .bind(user.id)
    .fetch_one(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch unread notification count: {}", e);
        ApiError::internal_server_error("Failed to fetch unread notification count")
    })?;

    Ok(Json(serde_json::json!({ "unread_count": count })))
}

// Mark notification as read/unread
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<MarkNotificationReadRequest>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM notifications WHERE id = ? AND user_id = ?")
            .bind(notification_id)
            .bind(user.id)
            .fetch_optional(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch notification: {}", e);
                ApiError::internal_server_error("Failed to fetch notification")
            })?;

    existing.ok_or_else(|| ApiError::not_found("Notification not found"))?;

    sqlx::query("UPDATE notifications SET read = ? WHERE id = ? AND user_id = ?")
        .bind(req.read)
        .bind(notification_id)
        .bind(user.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to update notification: {}", e);
            ApiError::internal_server_error("Failed to update notification")
        })?;

    let notification = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, type, title, body, read, created_at
        FROM notifications
        WHERE id = ?
        "#,
    )
    .bind(notification_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch updated notification: {}", e);
        ApiError::internal_server_error("Failed to fetch updated notification")
    })?
    .ok_or_else(|| ApiError::internal_server_error("Failed to fetch updated notification"))?;

    Ok(Json(NotificationResponse { notification }))
}

// Mark all notifications as read
pub async fn mark_all_read(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let result = sqlx::query(
        "UPDATE notifications SET read = TRUE WHERE user_id = ? AND read = FALSE",
    )
    .bind(user.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to mark all notifications as read: {}", e);
        ApiError::internal_server_error("Failed to mark all notifications as read")
    })?;

    Ok(Json(serde_json::json!({
        "updated_count": result.rows_affected()
    })))
}

// Delete a notification
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete notification: {}", e);
            ApiError::internal_server_error("Failed to delete notification")
        })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Notification not found"));
    }

    Ok(())
}
