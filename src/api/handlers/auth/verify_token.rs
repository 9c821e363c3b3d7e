//! Session-token introspection. Idempotent and side-effect free.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::api::gate::bearer_token;
use crate::auth::{config::AuthState, error::AuthError, session::SessionClaims};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub payload: SessionClaims,
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-token",
    responses (
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Token missing, malformed, or expired", body = crate::api::handlers::ErrorResponse),
    ),
    security(("session_token" = [])),
    tag = "auth",
)]
/// Decode and verify the bearer session token, returning its claims.
#[instrument(skip_all)]
pub async fn verify_token(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return AuthError::MissingCredential("Missing session token").into_response();
    };

    match state.codec().verify(&token) {
        Ok(payload) => Json(VerifyTokenResponse {
            success: true,
            payload,
        })
        .into_response(),
        Err(err) => AuthError::from(err).into_response(),
    }
}
