use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::{
    notify::NotificationService,
    routes::items::{can_manage_item, fetch_item_row, ItemRow},
    routes::models::{
        Claim, ClaimResponse, ClaimsResponse, CompleteClaimRequest, CreateClaimRequest,
        DecideClaimRequest,
    },
    util::require_bearer,
    ApiError, AppState,
};

const CLAIM_COLUMNS: &str = "id, public_id, item_id, claimant_user_id, evidence, status, \
     review_note, handover_location, handover_at, created_at, updated_at";

async fn fetch_claim(state: &AppState, public_id: &str) -> Result<Option<Claim>, ApiError> {
    sqlx::query_as::<_, Claim>(&format!(
        "SELECT {CLAIM_COLUMNS} FROM claims WHERE public_id = ?"
    ))
    .bind(public_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch claim: {}", e);
        ApiError::internal_server_error("Failed to fetch claim")
    })
}

async fn fetch_claim_item(state: &AppState, claim: &Claim) -> Result<ItemRow, ApiError> {
    let row: Option<(i64, i64, Option<i64>, String, String)> = sqlx::query_as(
        "SELECT id, owner_user_id, org_id, status, title FROM items WHERE id = ?",
    )
    .bind(claim.item_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch claimed item: {}", e);
        ApiError::internal_server_error("Failed to fetch claimed item")
    })?;

    let (id, owner_user_id, org_id, status, title) =
        row.ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(ItemRow {
        id,
        owner_user_id,
        org_id,
        status,
        title,
    })
}

#[utoipa::path(
    post,
    path = "/api/items/{item_id}/claims",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    request_body = CreateClaimRequest,
    responses(
        (status = 200, description = "Claim filed", body = ClaimResponse),
        (status = 400, description = "Invalid claim payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Cannot claim own item", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Open claim already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_claim(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.evidence.trim().is_empty() {
        return Err(ApiError::bad_request("Evidence must not be empty"));
    }

    let item = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if item.status == "deleted" {
        return Err(ApiError::not_found("Item not found"));
    }
    if item.status != "active" {
        return Err(ApiError::conflict("Item is no longer active"));
    }
    if can_manage_item(&state, user.id, &item).await? {
        return Err(ApiError::forbidden("Cannot claim your own item"));
    }

    // One open claim per claimant and item; refiling after rejection is fine.
    let open_claim: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM claims
        WHERE item_id = ? AND claimant_user_id = ? AND status IN ('pending', 'verified')
        "#,
    )
    .bind(item.id)
    .bind(user.id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check existing claims: {}", e);
        ApiError::internal_server_error("Failed to check existing claims")
    })?;

    if open_claim.is_some() {
        return Err(ApiError::conflict("An open claim already exists"));
    }

    let public_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO claims (public_id, item_id, claimant_user_id, evidence, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(item.id)
    .bind(user.id)
    .bind(&req.evidence)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to create claim: {}", e);
        ApiError::internal_server_error("Failed to create claim")
    })?;

    let claimant_name = user
        .display_name
        .clone()
        .or(user.email.clone())
        .unwrap_or_else(|| "A user".to_string());
    NotificationService::notify_claim_filed(
        state.db_pool(),
        item.owner_user_id,
        &claimant_name,
        &item.title,
    )
    .await?;

    let claim = fetch_claim(&state, &public_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Failed to fetch created claim"))?;

    Ok(Json(ClaimResponse { claim }))
}

#[utoipa::path(
    get,
    path = "/api/claims",
    tag = "Claims",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Claims filed by the caller", body = ClaimsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_my_claims(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClaimsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let claims = sqlx::query_as::<_, Claim>(&format!(
        r#"
        SELECT {CLAIM_COLUMNS}
        FROM claims
        WHERE claimant_user_id = ?
        ORDER BY created_at DESC
        "#
    ))
    .bind(user.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch claims: {}", e);
        ApiError::internal_server_error("Failed to fetch claims")
    })?;

    Ok(Json(ClaimsResponse { claims }))
}

#[utoipa::path(
    get,
    path = "/api/items/{item_id}/claims",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("item_id" = String, Path, description = "Item public identifier")
    ),
    responses(
        (status = 200, description = "Claims on the item, for its owner", body = ClaimsResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_item_claims(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ClaimsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let item = fetch_item_row(&state, &item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    if !can_manage_item(&state, user.id, &item).await? {
        return Err(ApiError::forbidden("Only the item owner can review claims"));
    }

    let claims = sqlx::query_as::<_, Claim>(&format!(
        r#"
        SELECT {CLAIM_COLUMNS}
        FROM claims
        WHERE item_id = ?
        ORDER BY created_at ASC
        "#
    ))
    .bind(item.id)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch item claims: {}", e);
        ApiError::internal_server_error("Failed to fetch item claims")
    })?;

    Ok(Json(ClaimsResponse { claims }))
}

#[utoipa::path(
    get,
    path = "/api/claims/{claim_id}",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("claim_id" = String, Path, description = "Claim public identifier")
    ),
    responses(
        (status = 200, description = "Claim detail", body = ClaimResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Claim not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ClaimResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let claim = fetch_claim(&state, &claim_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Claim not found"))?;

    let item = fetch_claim_item(&state, &claim).await?;

    let is_claimant = claim.claimant_user_id == user.id;
    if !is_claimant && !can_manage_item(&state, user.id, &item).await? {
        return Err(ApiError::forbidden("Not authorized for this claim"));
    }

    Ok(Json(ClaimResponse { claim }))
}

#[utoipa::path(
    post,
    path = "/api/claims/{claim_id}/verify",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("claim_id" = String, Path, description = "Claim public identifier")
    ),
    request_body = DecideClaimRequest,
    responses(
        (status = 200, description = "Claim verified", body = ClaimResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Claim not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Claim already decided", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
    headers: HeaderMap,
    payload: Option<Json<DecideClaimRequest>>,
) -> Result<Json<ClaimResponse>, ApiError> {
    decide_claim(state, claim_id, headers, payload, "verified").await
}

#[utoipa::path(
    post,
    path = "/api/claims/{claim_id}/reject",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("claim_id" = String, Path, description = "Claim public identifier")
    ),
    request_body = DecideClaimRequest,
    responses(
        (status = 200, description = "Claim rejected", body = ClaimResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Claim not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Claim already decided", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
    headers: HeaderMap,
    payload: Option<Json<DecideClaimRequest>>,
) -> Result<Json<ClaimResponse>, ApiError> {
    decide_claim(state, claim_id, headers, payload, "rejected").await
}

async fn decide_claim(
    state: AppState,
    claim_id: String,
    headers: HeaderMap,
    payload: Option<Json<DecideClaimRequest>>,
    decision: &str,
) -> Result<Json<ClaimResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let claim = fetch_claim(&state, &claim_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Claim not found"))?;

    let item = fetch_claim_item(&state, &claim).await?;

    if !can_manage_item(&state, user.id, &item).await? {
        return Err(ApiError::forbidden("Only the item owner can decide claims"));
    }
    if claim.status != "pending" {
        return Err(ApiError::conflict("Claim already decided"));
    }

    let review_note = payload.and_then(|Json(req)| req.review_note);
    let now = chrono::Utc::now().to_rfc3339();

    // Guarded transition: only a pending claim moves to a decision.
    let result = sqlx::query(
        "UPDATE claims SET status = ?, review_note = ?, updated_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(decision)
    .bind(&review_note)
    .bind(&now)
    .bind(claim.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to update claim: {}", e);
        ApiError::internal_server_error("Failed to update claim")
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Claim already decided"));
    }

    NotificationService::notify_claim_decision(
        state.db_pool(),
        claim.claimant_user_id,
        &item.title,
        decision,
    )
    .await?;

    let claim = fetch_claim(&state, &claim_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Failed to fetch updated claim"))?;

    Ok(Json(ClaimResponse { claim }))
}

#[utoipa::path(
    post,
    path = "/api/claims/{claim_id}/complete",
    tag = "Claims",
    security(("bearerAuth" = [])),
    params(
        ("claim_id" = String, Path, description = "Claim public identifier")
    ),
    request_body = CompleteClaimRequest,
    responses(
        (status = 200, description = "Handover recorded and item resolved", body = ClaimResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorResponse),
        (status = 404, description = "Claim not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Claim is not verified", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CompleteClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.handover_location.trim().is_empty() {
        return Err(ApiError::bad_request("Handover location must not be empty"));
    }

    let claim = fetch_claim(&state, &claim_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Claim not found"))?;

    let item = fetch_claim_item(&state, &claim).await?;

    if !can_manage_item(&state, user.id, &item).await? {
        return Err(ApiError::forbidden(
            "Only the item owner can complete claims",
        ));
    }
    if claim.status != "verified" {
        return Err(ApiError::conflict("Claim is not verified"));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE claims
        SET status = 'completed', handover_location = ?, handover_at = ?, updated_at = ?
        WHERE id = ? AND status = 'verified'
        "#,
    )
    .bind(&req.handover_location)
    .bind(&req.handover_at)
    .bind(&now)
    .bind(claim.id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to complete claim: {}", e);
        ApiError::internal_server_error("Failed to complete claim")
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Claim is not verified"));
    }

    // The handover closes out the listing.
    sqlx::query("UPDATE items SET status = 'resolved', updated_at = ? WHERE id = ? AND status = 'active'")
        .bind(&now)
        .bind(item.id)
        .execute(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve claimed item: {}", e);
            ApiError::internal_server_error("Failed to resolve claimed item")
        })?;

    NotificationService::notify_claim_completed(
        state.db_pool(),
        claim.claimant_user_id,
        &item.title,
        &req.handover_location,
    )
    .await?;

    let claim = fetch_claim(&state, &claim_id)
        .await?
        .ok_or_else(|| ApiError::internal_server_error("Failed to fetch updated claim"))?;

    Ok(Json(ClaimResponse { claim }))
}
