use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::verify_key::verify_key,
        handlers::auth::dual::dual_get,
        handlers::auth::dual::dual_post,
        handlers::auth::callback::callback_redirect,
        handlers::auth::callback::callback_json,
        handlers::auth::token::token,
        handlers::auth::verify_token::verify_token,
        handlers::auth::config::casdoor_config,
        handlers::holes::list,
        handlers::holes::hot,
        handlers::holes::search,
        handlers::holes::get,
        handlers::holes::stats,
    ),
    components(schemas(
        handlers::ErrorResponse,
        handlers::health::Health,
        handlers::auth::verify_key::VerifyKeyRequest,
        handlers::auth::verify_key::VerifyKeyResponse,
        handlers::auth::dual::DualAuthRequest,
        handlers::auth::dual::DualAuthResponse,
        handlers::auth::callback::CallbackRequest,
        handlers::auth::callback::CallbackResponse,
        handlers::auth::token::IssueTokenRequest,
        handlers::auth::token::IssueTokenResponse,
        handlers::auth::verify_token::VerifyTokenResponse,
        handlers::holes::HolesResponse,
        crate::auth::casdoor::PublicConfig,
        crate::auth::casdoor::Identity,
        crate::auth::session::SessionClaims,
        crate::hole::Hole,
        crate::hole::Comment,
        crate::hole::HoleWithComments,
        crate::hole::SearchResult,
        crate::hole::Stats,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Dual-factor authentication and session tokens"),
        (name = "holes", description = "Bulletin-board data routes"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "identity_token",
                SecurityScheme::Http(
                    HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build(),
                ),
            );
        }
    }
}
