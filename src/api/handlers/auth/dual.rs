//! Dual verification: both factors checked in one call, no token issued.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::auth::{
    casdoor::Identity,
    config::AuthState,
    error::AuthError,
    verifier,
};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DualAuthRequest {
    pub key: Option<String>,
    pub identity_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DualAuthResponse {
    pub success: bool,
    pub user: Identity,
}

/// Key first, then identity. The key check is local and cheap; the
/// identity check is the only network call.
async fn authenticate(
    state: &AuthState,
    request: DualAuthRequest,
) -> Result<DualAuthResponse, AuthError> {
    let key = request.key.unwrap_or_default();
    verifier::verify_api_key(&key, state.config().access_key())?;

    let token = request.identity_token.unwrap_or_default();
    let user = verifier::verify_identity_token(state.casdoor(), &token).await?;

    Ok(DualAuthResponse {
        success: true,
        user,
    })
}

#[utoipa::path(
    get,
    path = "/api/auth",
    params(DualAuthRequest),
    responses (
        (status = 200, description = "Both factors verified", body = DualAuthResponse),
        (status = 401, description = "A factor was missing or rejected", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth",
)]
/// Verify both factors passed as query parameters.
#[instrument(skip_all)]
pub async fn dual_get(
    Extension(state): Extension<Arc<AuthState>>,
    Query(request): Query<DualAuthRequest>,
) -> Response {
    respond(authenticate(&state, request).await)
}

#[utoipa::path(
    post,
    path = "/api/auth",
    request_body = DualAuthRequest,
    responses (
        (status = 200, description = "Both factors verified", body = DualAuthResponse),
        (status = 401, description = "A factor was missing or rejected", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth",
)]
/// Verify both factors passed in the request body.
#[instrument(skip_all)]
pub async fn dual_post(
    Extension(state): Extension<Arc<AuthState>>,
    Json(request): Json<DualAuthRequest>,
) -> Response {
    respond(authenticate(&state, request).await)
}

fn respond(result: Result<DualAuthResponse, AuthError>) -> Response {
    match result {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn call(endpoint: String, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route("/api/auth", get(dual_get).post(dual_post))
            .layer(Extension(test_support::state_with_endpoint(endpoint)));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value)
    }

    #[tokio::test]
    async fn valid_key_and_token_return_user() {
        let endpoint = test_support::fake_casdoor().await;
        let (status, body) =
            call(endpoint, "/api/auth?key=secret123&identityToken=idp-token").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], "u-1");
        assert_eq!(body["user"]["email"], "u1@example.com");
    }

    #[tokio::test]
    async fn wrong_key_fails_before_identity_call() {
        // The provider endpoint is unreachable; a key failure must still
        // answer without touching it.
        let (status, body) = call(
            "http://127.0.0.1:1".to_string(),
            "/api/auth?key=wrong&identityToken=idp-token",
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn missing_identity_token_is_401() {
        let endpoint = test_support::fake_casdoor().await;
        let (status, body) = call(endpoint, "/api/auth?key=secret123").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing identity token");
    }
}
