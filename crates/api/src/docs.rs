use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::auth::signup,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::users::get_current_user,
        crate::routes::users::update_current_user,
        crate::routes::users::admin_update_user,
        crate::routes::items::list_items,
        crate::routes::items::create_item,
        crate::routes::items::get_item,
        crate::routes::items::update_item,
        crate::routes::items::delete_item,
        crate::routes::items::resolve_item,
        crate::routes::claims::create_claim,
        crate::routes::claims::list_my_claims,
        crate::routes::claims::list_item_claims,
        crate::routes::claims::get_claim,
        crate::routes::claims::verify_claim,
        crate::routes::claims::reject_claim,
        crate::routes::claims::complete_claim
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::SignupRequest,
            crate::routes::auth::LoginRequest,
            crate::routes::auth::SessionResponse,
            crate::routes::auth::UserResponse,
            crate::routes::users::UserProfileResponse,
            crate::routes::users::UpdateUserProfileRequest,
            crate::routes::users::AdminUpdateUserRequest,
            crate::routes::models::Item,
            crate::routes::models::CreateItemRequest,
            crate::routes::models::UpdateItemRequest,
            crate::routes::models::ItemsResponse,
            crate::routes::models::ItemDetailResponse,
            crate::routes::models::Claim,
            crate::routes::models::CreateClaimRequest,
            crate::routes::models::DecideClaimRequest,
            crate::routes::models::CompleteClaimRequest,
            crate::routes::models::ClaimsResponse,
            crate::routes::models::ClaimResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health endpoints"),
        (name = "Auth", description = "Authentication and session management"),
        (name = "Users", description = "User profile management"),
        (name = "Items", description = "Lost and found listings"),
        (name = "Claims", description = "Ownership claims and handover")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let schemes = &mut components.security_schemes;

        let mut scheme = SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer));
        if let SecurityScheme::Http(http) = &mut scheme {
            http.bearer_format = Some("Bearer".to_string());
        }

        schemes.insert("bearerAuth".to_string(), scheme);
    }
}
