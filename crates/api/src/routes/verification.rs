use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{
    notify::NotificationService,
    routes::models::{
        DecideVerificationRequest, OrganizationVerification, SubmitVerificationRequest,
        VerificationResponse, VerificationsResponse,
    },
    routes::organizations::{member_role, resolve_org},
    util::require_bearer,
    ApiError, AppState,
};

const VERIFICATION_COLUMNS: &str = "id, org_id, submitted_by, registration_number, document_url, \
     notes, status, reviewed_by, review_note, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct ListVerificationsQuery {
    pub status: Option<String>,
}

pub async fn submit_verification(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SubmitVerificationRequest>,
) -> Result<Json<VerificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if req.registration_number.trim().is_empty() {
        return Err(ApiError::bad_request(
            "Registration number must not be empty",
        ));
    }

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    let role = member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;
    if role != "admin" {
        return Err(ApiError::forbidden(
            "Only admins can submit a verification application",
        ));
    }

    // A rejected application may be resubmitted; a pending one may not.
    let pending: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM organization_verifications WHERE org_id = ? AND status = 'pending'",
    )
    .bind(org_db_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to check pending verification: {}", e);
        ApiError::internal_server_error("Failed to check pending verification")
    })?;

    if pending.is_some() {
        return Err(ApiError::conflict(
            "A verification application is already pending",
        ));
    }

    let now = chrono::Utc::now().to_rfc3339();

    let verification_id = sqlx::query(
        r#"
        INSERT INTO organization_verifications (
            org_id, submitted_by, registration_number, document_url, notes, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(org_db_id)
    .bind(user.id)
    .bind(&req.registration_number)
    .bind(&req.document_url)
    .bind(&req.notes)
    .bind(&now)
    .bind(&now)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to submit verification: {}", e);
        ApiError::internal_server_error("Failed to submit verification")
    })?
    .last_insert_rowid();

    let verification = fetch_verification(&state, verification_id).await?;

    Ok(Json(VerificationResponse { verification }))
}

// Latest application for the organization, newest first.
pub async fn get_verification(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VerificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    let (org_db_id, _) = resolve_org(&state, &org_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found"))?;

    member_role(&state, org_db_id, user.id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Not a member of this organization"))?;

    let verification = sqlx::query_as::<_, OrganizationVerification>(&format!(
        r#"
        SELECT {VERIFICATION_COLUMNS}
        FROM organization_verifications
        WHERE org_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(org_db_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch verification: {}", e);
        ApiError::internal_server_error("Failed to fetch verification")
    })?
    .ok_or_else(|| ApiError::not_found("No verification application"))?;

    Ok(Json(VerificationResponse { verification }))
}

// Platform-admin review queue.
pub async fn admin_list_verifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListVerificationsQuery>,
) -> Result<Json<VerificationsResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !user.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let status = query.status.unwrap_or_else(|| "pending".to_string());
    if !["pending", "approved", "rejected"].contains(&status.as_str()) {
        return Err(ApiError::bad_request("Invalid status filter"));
    }

    let verifications = sqlx::query_as::<_, OrganizationVerification>(&format!(
        r#"
        SELECT {VERIFICATION_COLUMNS}
        FROM organization_verifications
        WHERE status = ?
        ORDER BY created_at ASC
        "#
    ))
    .bind(&status)
    .fetch_all(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch verification queue: {}", e);
        ApiError::internal_server_error("Failed to fetch verification queue")
    })?;

    Ok(Json(VerificationsResponse { verifications }))
}

pub async fn approve_verification(
    State(state): State<AppState>,
    Path(verification_id): Path<i64>,
    headers: HeaderMap,
    payload: Option<Json<DecideVerificationRequest>>,
) -> Result<Json<VerificationResponse>, ApiError> {
    decide_verification(state, verification_id, headers, payload, "approved").await
}

pub async fn reject_verification(
    State(state): State<AppState>,
    Path(verification_id): Path<i64>,
    headers: HeaderMap,
    payload: Option<Json<DecideVerificationRequest>>,
) -> Result<Json<VerificationResponse>, ApiError> {
    decide_verification(state, verification_id, headers, payload, "rejected").await
}

async fn decide_verification(
    state: AppState,
    verification_id: i64,
    headers: HeaderMap,
    payload: Option<Json<DecideVerificationRequest>>,
    decision: &str,
) -> Result<Json<VerificationResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    if !user.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let verification = fetch_verification(&state, verification_id).await?;
    if verification.status != "pending" {
        return Err(ApiError::conflict("Application already decided"));
    }

    let review_note = payload.and_then(|Json(req)| req.review_note);
    let now = chrono::Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE organization_verifications
        SET status = ?, reviewed_by = ?, review_note = ?, updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(decision)
    .bind(user.id)
    .bind(&review_note)
    .bind(&now)
    .bind(verification_id)
    .execute(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to decide verification: {}", e);
        ApiError::internal_server_error("Failed to decide verification")
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Application already decided"));
    }

    let org_name: String = sqlx::query_scalar("SELECT name FROM organizations WHERE id = ?")
        .bind(verification.org_id)
        .fetch_one(state.db_pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch organization: {}", e);
            ApiError::internal_server_error("Failed to fetch organization")
        })?;

    if decision == "approved" {
        sqlx::query("UPDATE organizations SET verified = TRUE, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(verification.org_id)
            .execute(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to mark organization verified: {}", e);
                ApiError::internal_server_error("Failed to mark organization verified")
            })?;

        sqlx::query("UPDATE users SET verified = TRUE, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(verification.submitted_by)
            .execute(state.db_pool())
            .await
            .map_err(|e| {
                tracing::error!("Failed to mark submitter verified: {}", e);
                ApiError::internal_server_error("Failed to mark submitter verified")
            })?;
    }

    NotificationService::notify_verification_decision(
        state.db_pool(),
        verification.submitted_by,
        &org_name,
        decision,
    )
    .await?;

    let verification = fetch_verification(&state, verification_id).await?;

    Ok(Json(VerificationResponse { verification }))
}

async fn fetch_verification(
    state: &AppState,
    verification_id: i64,
) -> Result<OrganizationVerification, ApiError> {
    sqlx::query_as::<_, OrganizationVerification>(&format!(
        "SELECT {VERIFICATION_COLUMNS} FROM organization_verifications WHERE id = ?"
    ))
    .bind(verification_id)
    .fetch_optional(state.db_pool())
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch verification: {}", e);
        ApiError::internal_server_error("Failed to fetch verification")
    })?
    .ok_or_else(|| ApiError::not_found("Verification not found"))
}
