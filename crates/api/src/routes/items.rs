use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    routes::models::{
        CreateItemRequest, Item, ItemDetailResponse, ItemsResponse, UpdateItemRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};
use utoipa::IntoParams;

const ITEM_KINDS: &[&str] = &["lost", "found"];
const ITEM_STATUSES: &[&str] = &["active", "resolved", "deleted"];

const ITEM_COLUMNS: &str = "id, public_id, owner_user_id, org_id, kind, title, description, \
     category, location, occurred_at, show_email, show_phone, status, created_at, updated_at";

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListItemsQuery {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
    pub location: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Minimal row used for ownership checks before a mutation.
pub(crate) struct ItemRow {
    pub id: i64,
    pub owner_user_id: i64,
    pub org_id: Option<i64>,
    pub status: String,
    pub title: String,
}

pub(crate) async fn fetch_item_row(
    state: &AppState,
    public_id: &str,
) -> Result<Option<ItemRow>, ApiError> {
    let row: Option<(i64, i64, Option<i64>, String, String)> = sqlx::query_as(
        "SELECT id, owner_user_id, org_id, status, title FROM items WHERE public_id = ?",
    )
    .bind(public_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch item: {}", e);
        ApiError::internal_server_error("Failed to fetch item")
    })?;

    Ok(row.map(|(id, owner_user_id, org_id, status, title)| ItemRow {
        id,
        owner_user_id,
        org_id,
        status,
        title,
    }))
}

/// The item owner and every roster member of the owning organization may
/// manage the listing.
pub(crate) async fn can_manage_item(
    state: &AppState,
    user_id: i64,
    item: &ItemRow,
) -> Result<bool, ApiError> {
    if item.owner_user_id == user_id {
        return Ok(true);
    }

    let Some(org_id) = item.org_id else {
        return Ok(false);
    };

    let member: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM organization_members WHERE org_id = ? AND user_id = ?",
    )
    .bind(org_id)
    .bind(user_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check organization membership: {}", e);
        ApiError::internal_server_error("Failed to check organization membership")
    })?;

    Ok(member.is_some())
}

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    security(("bearerAuth" = [])),
    params(ListItemsQuery),
    responses(
        (status = 200, description = "Browse and search listings", body = ItemsResponse),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch items", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let status = query.status.as_deref().unwrap_or("active");
    if !ITEM_STATUSES.contains(&status) {
        return Err(ApiError::bad_request("Invalid status filter"));
    }
    if let Some(kind) = query.kind.as_deref() {
        if !ITEM_KINDS.contains(&kind) {
            return Err(ApiError::bad_request("Invalid kind filter"));
        }
    }

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    // Resolved and deleted listings are only browsable by their owner.
    let owner_scope: Option<i64> = if status == "active" {
        None
    } else {
        Some(user.id)
    };

    let items = sqlx::query_as::<_, Item>(&format!(
        r#"
        SELECT {ITEM_COLUMNS}
        FROM items
        WHERE status = ?
          AND (? IS NULL OR owner_user_id = ?)
          AND (? IS NULL OR kind = ?)
          AND (? IS NULL OR category = ?)
          AND (? IS NULL OR location LIKE '%' || ? || '%')
          AND (? IS NULL OR title LIKE '%' || ? || '%' OR description LIKE '%' || ? || '%')
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(status)
    .bind(owner_scope)
    .bind(owner_scope)
    .bind(&query.kind)
    .bind(&query.kind)
    .bind(&query.category)
    .bind(&query.category)
    .bind(&query.location)
    .bind(&query.location)
    .bind(&query.q)
    .bind(&query.q)
    .bind(&query.q)
    .bind(limit)
    .bind(offset)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch items: {}", e);
        ApiError::internal_server_error("Failed to fetch items")
    })?;

    Ok(Json(ItemsResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    security(("bearerAuth" = [])),
    request_body = CreateItemRequest,
    responses(
        (status = 200, description = "Listing created", body = ItemDetailResponse),
        (status = 400, description = "Invalid listing payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a member of the organization", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to create listing", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !ITEM_KINDS.contains(&req.kind.as_str()) {
        return Err(ApiError::bad_request("Kind must be 'lost' or 'found'"));
    }
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title must not be empty"));
    }

    // Posting under an organization requires roster membership.
    let org_db_id = if let Some(org_public_id) = &req.org_id {
        let org_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT o.id FROM organizations o
            JOIN organization_members om ON o.id = om.org_id
            WHERE o.public_id = ? AND om.user_id = ?
            "#,
        )
        .bind(org_public_id)
        .bind(user.id)
        .fetch_optional(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve organization: {}", e);
            ApiError::internal_server_error("Failed to resolve organization")
        })?;

        Some(org_id.ok_or_else(|| ApiError::forbidden("Not a member of the organization"))?)
    } else {
        None
    };

    let public_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO items (
            public_id, owner_user_id, org_id, kind, title, description, category,
            location, occurred_at, show_email, show_phone, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(user.id)
    .bind(org_db_id)
    .bind(&req.kind)
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.category)
    .bind(&req.location)
    .bind(&req.occurred_at)
    .bind(req.show_email)
    .bind(req.show_phone)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create item: {}", e);
        ApiError::internal_server_error("Failed to create item")
    })?;

    let item = fetch_item_by_public_id(&state, &public_id).await?;

    Ok(Json(ItemDetailResponse {
        contact_email: user.email.clone(),
        contact_phone: user.phone.clone(),
        item,
    }))
}

#[utoipa::path(
    get,
    path = "/api/items/{item_id}",
    tag = "Items",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    responses(
        (status = 200, description = "Listing detail", body = ItemDetailResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to fetch item", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let item = fetch_item_by_public_id(&state, &item_id).await?;

    if item.status == "deleted" && item.owner_user_id != user.id {
        return Err(ApiError::not_found("Item not found"));
    }

    let (owner_email, owner_phone): (Option<String>, Option<String>) =
        sqlx::query_as("SELECT email, phone FROM users WHERE id = ?")
            .bind(item.owner_user_id)
            .fetch_one(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch item owner: {}", e);
                ApiError::internal_server_error("Failed to fetch item owner")
            })?;

    let is_owner = item.owner_user_id == user.id;
    let contact_email = if is_owner || item.show_email {
        owner_email
    } else {
        None
    };
    let contact_phone = if is_owner || item.show_phone {
        owner_phone
    } else {
        None
    };

    Ok(Json(ItemDetailResponse {
        item,
        contact_email,
        contact_phone,
    }))
}

#[utoipa::path(
    put,
    path = "/api/items/{item_id}",
    tag = "Items",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Listing updated", body = ItemDetailResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to update item", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let row = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if row.status == "deleted" {
        return Err(ApiError::not_found("Item not found"));
    }
    if !can_manage_item(&state, user.id, &row).await? {
        return Err(ApiError::forbidden("Only the owner can update this item"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        UPDATE items
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            location = COALESCE(?, location),
            occurred_at = COALESCE(?, occurred_at),
            show_email = COALESCE(?, show_email),
            show_phone = COALESCE(?, show_phone),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(&req.category)
    .bind(&req.location)
    .bind(&req.occurred_at)
    .bind(req.show_email)
    .bind(req.show_phone)
    .bind(&now)
    .bind(row.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update item: {}", e);
        ApiError::internal_server_error("Failed to update item")
    })?;

    let item = fetch_item_by_public_id(&state, &item_id).await?;

    Ok(Json(ItemDetailResponse {
        item,
        contact_email: None,
        contact_phone: None,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/items/{item_id}",
    tag = "Items",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    responses(
        (status = 200, description = "Listing soft-deleted"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 500, description = "Failed to delete item", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<(), ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let row = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if row.status == "deleted" {
        return Err(ApiError::not_found("Item not found"));
    }
    if !can_manage_item(&state, user.id, &row).await? {
        return Err(ApiError::forbidden("Only the owner can delete this item"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    // Soft delete: the row stays for claims and message history.
    sqlx::query("UPDATE items SET status = 'deleted', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(row.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete item: {}", e);
            ApiError::internal_server_error("Failed to delete item")
        })?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/resolve",
    tag = "Items",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    responses(
        (status = 200, description = "Listing marked resolved", body = ItemDetailResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Item is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn resolve_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ItemDetailResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let row = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if row.status == "deleted" {
        return Err(ApiError::not_found("Item not found"));
    }
    if !can_manage_item(&state, user.id, &row).await? {
        return Err(ApiError::forbidden("Only the owner can resolve this item"));
    }
    if row.status != "active" {
        return Err(ApiError::conflict("Item is not active"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("UPDATE items SET status = 'resolved', updated_at = ? WHERE id = ?")
        .bind(&now)
        .bind(row.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve item: {}", e);
            ApiError::internal_server_error("Failed to resolve item")
        })?;

    let item = fetch_item_by_public_id(&state, &item_id).await?;

    Ok(Json(ItemDetailResponse {
        item,
        contact_email: None,
        contact_phone: None,
    }))
}

async fn fetch_item_by_public_id(state: &AppState, public_id: &str) -> Result<Item, ApiError> {
    sqlx::query_as::<_, Item>(&format!(
        "SELECT {ITEM_COLUMNS} FROM items WHERE public_id = ?"
    ))
    .bind(public_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch item: {}", e);
        ApiError::internal_server_error("Failed to fetch item")
    })?
    .ok_or_else(|| ApiError::not_found("Item not found"))
}
