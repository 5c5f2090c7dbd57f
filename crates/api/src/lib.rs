mod docs;
mod error;
mod notify;
mod state;
mod util;

pub mod routes;

pub use error::ApiError;
pub use notify::NotificationService;
pub use state::AppState;

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth routes
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        // Profile routes
        .route("/api/users/me", get(routes::users::get_current_user))
        .route("/api/users/me", patch(routes::users::update_current_user))
        .route(
            "/api/admin/users/:user_id",
            patch(routes::users::admin_update_user),
        )
        // Item routes
        .route("/api/items", get(routes::items::list_items))
        .route("/api/items", post(routes::items::create_item))
        .route("/api/items/:item_id", get(routes::items::get_item))
        .route("/api/items/:item_id", put(routes::items::update_item))
        .route("/api/items/:item_id", delete(routes::items::delete_item))
        .route(
            "/api/items/:item_id/resolve",
            post(routes::items::resolve_item),
        )
        // Claim routes
        .route(
            "/api/items/:item_id/claims",
            get(routes::claims::list_item_claims),
        )
        .route(
            "/api/items/:item_id/claims",
            post(routes::claims::create_claim),
        )
        .route("/api/claims", get(routes::claims::list_my_claims))
        .route("/api/claims/:claim_id", get(routes::claims::get_claim))
        .route(
            "/api/claims/:claim_id/verify",
            post(routes::claims::verify_claim),
        )
        .route(
            "/api/claims/:claim_id/reject",
            post(routes::claims::reject_claim),
        )
        .route(
            "/api/claims/:claim_id/complete",
            post(routes::claims::complete_claim),
        )
        // Conversation routes
        .route(
            "/api/items/:item_id/conversations",
            post(routes::conversations::open_conversation),
        )
        .route(
            "/api/conversations",
            get(routes::conversations::list_conversations),
        )
        .route(
            "/api/conversations/:conversation_id/messages",
            get(routes::conversations::get_messages),
        )
        .route(
            "/api/conversations/:conversation_id/messages",
            post(routes::conversations::create_message),
        )
        // Notification routes
        .route(
            "/api/notifications",
            get(routes::notifications::get_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(routes::notifications::get_unread_count),
        )
        .route(
            "/api/notifications/:notification_id/read",
            put(routes::notifications::mark_notification_read),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:notification_id",
            delete(routes::notifications::delete_notification),
        )
        // Organization routes
        .route(
            "/api/organizations",
            post(routes::organizations::create_organization),
        )
        .route(
            "/api/organizations/:org_id",
            get(routes::organizations::get_organization),
        )
        .route(
            "/api/organizations/:org_id",
            put(routes::organizations::update_organization),
        )
        .route(
            "/api/organizations/:org_id/members",
            get(routes::organizations::list_members),
        )
        .route(
            "/api/organizations/:org_id/members",
            post(routes::organizations::add_member),
        )
        .route(
            "/api/organizations/:org_id/members/:member_user_id",
            put(routes::organizations::update_member_role),
        )
        .route(
            "/api/organizations/:org_id/members/:member_user_id",
            delete(routes::organizations::remove_member),
        )
        .route(
            "/api/organizations/:org_id/contacts",
            get(routes::organizations::list_contacts),
        )
        .route(
            "/api/organizations/:org_id/contacts",
            post(routes::organizations::create_contact),
        )
        .route(
            "/api/organizations/:org_id/contacts/:contact_id",
            put(routes::organizations::update_contact),
        )
        .route(
            "/api/organizations/:org_id/contacts/:contact_id",
            delete(routes::organizations::delete_contact),
        )
        .route(
            "/api/organizations/:org_id/contracts",
            get(routes::organizations::list_contracts),
        )
        .route(
            "/api/organizations/:org_id/contracts",
            post(routes::organizations::create_contract),
        )
        .route(
            "/api/organizations/:org_id/contracts/:contract_id",
            put(routes::organizations::update_contract),
        )
        // Verification routes
        .route(
            "/api/organizations/:org_id/verification",
            get(routes::verification::get_verification),
        )
        .route(
            "/api/organizations/:org_id/verification",
            post(routes::verification::submit_verification),
        )
        .route(
            "/api/admin/verifications",
            get(routes::verification::admin_list_verifications),
        )
        .route(
            "/api/admin/verifications/:verification_id/approve",
            post(routes::verification::approve_verification),
        )
        .route(
            "/api/admin/verifications/:verification_id/reject",
            post(routes::verification::reject_verification),
        )
        .merge(SwaggerUi::new("/docs").url("/docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(state)
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
