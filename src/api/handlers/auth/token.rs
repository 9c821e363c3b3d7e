//! Session-token issuance: the only place both claims flags are set.

use axum::{
    extract::Extension,
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::api::gate::bearer_token;
use crate::auth::{casdoor::Identity, config::AuthState, error::AuthError, verifier};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueTokenRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueTokenResponse {
    pub token: String,
    pub user: Identity,
}

#[utoipa::path(
    post,
    path = "/api/auth/token",
    request_body = IssueTokenRequest,
    responses (
        (status = 200, description = "Both factors verified, session token issued", body = IssueTokenResponse),
        (status = 401, description = "A factor was missing or rejected", body = crate::api::handlers::ErrorResponse),
        (status = 500, description = "Signing secret not configured", body = crate::api::handlers::ErrorResponse),
    ),
    security(("identity_token" = [])),
    tag = "auth",
)]
/// Verify the API key from the body and the identity token from the
/// `Authorization` header, then issue a session token asserting both.
#[instrument(skip_all)]
pub async fn token(
    Extension(state): Extension<Arc<AuthState>>,
    headers: HeaderMap,
    Json(body): Json<IssueTokenRequest>,
) -> Response {
    match issue(&state, &headers, body).await {
        Ok(response) => {
            // Tokens must never land in shared caches.
            ([(CACHE_CONTROL, "no-store")], Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn issue(
    state: &AuthState,
    headers: &HeaderMap,
    body: IssueTokenRequest,
) -> Result<IssueTokenResponse, Response> {
    let key = body.key.unwrap_or_default();
    verifier::verify_api_key(&key, state.config().access_key())
        .map_err(IntoResponse::into_response)?;

    let identity_token = bearer_token(headers)
        .ok_or_else(|| AuthError::MissingCredential("Missing identity token").into_response())?;
    let user = verifier::verify_identity_token(state.casdoor(), &identity_token)
        .await
        .map_err(IntoResponse::into_response)?;

    let token = state
        .codec()
        .issue(&user.id, user.email.clone(), true, true)
        .map_err(|err| {
            error!("Failed to issue session token: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Token issuance failed" })),
            )
                .into_response()
        })?;

    Ok(IssueTokenResponse { token, user })
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

    async fn issue_token(
        endpoint: String,
        key: serde_json::Value,
        bearer: Option<&str>,
    ) -> (StatusCode, serde_json::Value, Option<String>) {
        let state = test_support::state_with_endpoint(endpoint);
        let app = Router::new()
            .route("/api/auth/token", post(token))
            .layer(Extension(state.clone()));

        let mut request = Request::builder()
            .method("POST")
            .uri("/api/auth/token")
            .header("content-type", "application/json");
        if let Some(bearer) = bearer {
            request = request.header("authorization", format!("Bearer {bearer}"));
        }
        let response = app
            .oneshot(request.body(Body::from(key.to_string())).expect("request"))
            .await
            .expect("response");

        let status = response.status();
        let cache = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes).expect("json body");
        (status, value, cache)
    }

    #[tokio::test]
    async fn issues_fully_verified_token() {
        let endpoint = test_support::fake_casdoor().await;
        let (status, body, cache) =
            issue_token(endpoint, json!({ "key": "secret123" }), Some("idp-token")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body["user"]["id"], "u-1");

        // The issued token must verify with both flags true.
        let state = test_support::state();
        let claims = state
            .codec()
            .verify(body["token"].as_str().expect("token"))
            .expect("claims");
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email.as_deref(), Some("u1@example.com"));
        assert!(claims.fully_authenticated());
    }

    #[tokio::test]
    async fn wrong_key_is_rejected_before_identity() {
        let (status, body, _) = issue_token(
            "http://127.0.0.1:1".to_string(),
            json!({ "key": "wrong" }),
            Some("idp-token"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn missing_bearer_is_401() {
        let endpoint = test_support::fake_casdoor().await;
        let (status, body, _) = issue_token(endpoint, json!({ "key": "secret123" }), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing identity token");
    }
}
