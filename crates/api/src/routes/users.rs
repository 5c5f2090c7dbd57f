use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use reclaim_auth::{AdminUserUpdate, UpdateUserProfile};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{routes::auth::UserResponse, util::require_bearer, ApiError, AppState};

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserProfileRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub display_name: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
}

impl UpdateUserProfileRequest {
    fn into_update(self) -> UpdateUserProfile {
        UpdateUserProfile {
            display_name: self.display_name,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub role: Option<String>,
    pub verified: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserProfileResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;

    Ok(Json(UserProfileResponse { user: user.into() }))
}

#[utoipa::path(
    patch,
    path = "/api/users/me",
    tag = "Users",
    security(("bearerAuth" = [])),
    request_body = UpdateUserProfileRequest,
    responses(
        (status = 200, description = "Updated user profile", body = UserProfileResponse),
        (status = 400, description = "Invalid profile payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpdateUserProfileRequest>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (user, _) = state.authenticate(&token).await?;
    let update = payload.into_update();
    let updated = state
        .authenticator()
        .update_user_profile(user.id, update)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(UserProfileResponse {
        user: updated.into(),
    }))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(
        ("user_id" = String, Path, description = "User public identifier")
    ),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "Profile repaired", body = UserProfileResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn admin_update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (caller, _) = state.authenticate(&token).await?;

    if !caller.is_admin {
        return Err(ApiError::forbidden("Admin access required"));
    }

    let updated = state
        .authenticator()
        .admin_update_user(
            &user_id,
            AdminUserUpdate {
                role: payload.role,
                verified: payload.verified,
            },
        )
        .await
        .map_err(ApiError::from)?;

    Ok(Json(UserProfileResponse {
        user: updated.into(),
    }))
}
