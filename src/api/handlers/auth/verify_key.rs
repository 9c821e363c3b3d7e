//! Stage 1 of the handshake: prove knowledge of the shared API key.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::auth::{config::AuthState, verifier};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyKeyRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyKeyResponse {
    pub success: bool,
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-key",
    request_body = VerifyKeyRequest,
    responses (
        (status = 200, description = "API key accepted", body = VerifyKeyResponse),
        (status = 400, description = "No key in the request body", body = crate::api::handlers::ErrorResponse),
        (status = 401, description = "Key rejected", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth",
)]
/// Check the submitted API key against the configured one.
#[instrument(skip_all)]
pub async fn verify_key(
    Extension(state): Extension<Arc<AuthState>>,
    Json(body): Json<VerifyKeyRequest>,
) -> Response {
    let Some(key) = body.key.filter(|key| !key.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "API key is required" })),
        )
            .into_response();
    };

    match verifier::verify_api_key(&key, state.config().access_key()) {
        Ok(()) => Json(VerifyKeyResponse { success: true }).into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/auth/verify-key", post(verify_key))
            .layer(Extension(test_support::state()))
    }

    async fn post_key(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/verify-key")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
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
    async fn correct_key_succeeds() {
        let (status, body) = post_key(json!({ "key": "secret123" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn wrong_key_is_401_with_structured_error() {
        let (status, body) = post_key(json!({ "key": "wrong" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn missing_key_is_400() {
        let (status, body) = post_key(json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "API key is required");

        let (status, _) = post_key(json!({ "key": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
