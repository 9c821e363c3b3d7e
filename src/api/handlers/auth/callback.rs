//! OAuth callback: code-for-token exchange.
//!
//! Two shapes: the browser `GET` redirect flow with the
//! `/login?error=<reason>` vocabulary, and a JSON `POST` variant for
//! clients driving the exchange themselves. A failed exchange returns
//! the user to the identity stage only; the verified key survives
//! client-side.

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{casdoor, config::AuthState, error::AuthError};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CallbackRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackResponse {
    pub success: bool,
    pub token: String,
}

fn login_error(reason: &str) -> Response {
    Redirect::temporary(&format!("/login?error={reason}")).into_response()
}

#[utoipa::path(
    get,
    path = "/api/auth/callback",
    params(CallbackParams),
    responses (
        (status = 307, description = "Redirect to /callback?token=... on success, /login?error=... on failure"),
    ),
    tag = "auth",
)]
/// Browser leg of the OAuth flow: exchange the code and bounce back to
/// the frontend with the identity token in the query string.
#[instrument(skip_all)]
pub async fn callback_redirect(
    Extension(state): Extension<Arc<AuthState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        return login_error("missing_code");
    };

    match state
        .casdoor()
        .exchange_code(&code, &state.config().redirect_uri())
        .await
    {
        Ok(token) => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("token", &token)
                .finish();
            Redirect::temporary(&format!("/callback?{query}")).into_response()
        }
        Err(casdoor::Error::NoAccessToken) => login_error("no_access_token"),
        Err(casdoor::Error::Exchange(err)) => {
            warn!("Token exchange failed: {}", err);
            login_error("token_exchange_failed")
        }
        Err(err) => {
            warn!("Callback failed: {}", err);
            login_error("callback_failed")
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/callback",
    request_body = CallbackRequest,
    responses (
        (status = 200, description = "Code exchanged for an identity token", body = CallbackResponse),
        (status = 400, description = "No code in the request body", body = crate::api::handlers::ErrorResponse),
        (status = 401, description = "Exchange rejected", body = crate::api::handlers::ErrorResponse),
    ),
    tag = "auth",
)]
/// JSON leg of the OAuth flow for clients that captured the code
/// themselves.
#[instrument(skip_all)]
pub async fn callback_json(
    Extension(state): Extension<Arc<AuthState>>,
    Json(body): Json<CallbackRequest>,
) -> Response {
    let Some(code) = body.code.filter(|code| !code.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Authorization code is required" })),
        )
            .into_response();
    };

    match state
        .casdoor()
        .exchange_code(&code, &state.config().redirect_uri())
        .await
    {
        Ok(token) => Json(CallbackResponse {
            success: true,
            token,
        })
        .into_response(),
        Err(err) => AuthError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support;
    use axum::{
        body::{to_bytes, Body},
        http::{header::LOCATION, Request},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app(endpoint: String) -> Router {
        Router::new()
            .route(
                "/api/auth/callback",
                get(callback_redirect).post(callback_json),
            )
            .layer(Extension(test_support::state_with_endpoint(endpoint)))
    }

    async fn get_location(endpoint: String, uri: &str) -> String {
        let response = app(endpoint)
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .expect("location")
            .to_string()
    }

    #[tokio::test]
    async fn missing_code_redirects_with_reason() {
        let location =
            get_location("http://127.0.0.1:1".to_string(), "/api/auth/callback").await;
        assert_eq!(location, "/login?error=missing_code");
    }

    #[tokio::test]
    async fn successful_exchange_redirects_with_token() {
        let endpoint = test_support::fake_casdoor().await;
        let location = get_location(endpoint, "/api/auth/callback?code=abc").await;
        assert_eq!(location, "/callback?token=idp-token");
    }

    #[tokio::test]
    async fn unreachable_provider_redirects_with_exchange_error() {
        let location =
            get_location("http://127.0.0.1:1".to_string(), "/api/auth/callback?code=abc").await;
        assert_eq!(location, "/login?error=token_exchange_failed");
    }

    #[tokio::test]
    async fn exchange_without_token_redirects_with_reason() {
        let router = Router::new().route(
            "/api/login/oauth/access_token",
            axum::routing::post(|| async { Json(json!({ "error": "invalid_grant" })) }),
        );
        let endpoint = test_support::serve(router).await;
        let location = get_location(endpoint, "/api/auth/callback?code=bad").await;
        assert_eq!(location, "/login?error=no_access_token");
    }

    #[tokio::test]
    async fn json_variant_returns_token() {
        let endpoint = test_support::fake_casdoor().await;
        let response = app(endpoint)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/callback")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "code": "abc" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["success"], true);
        assert_eq!(body["token"], "idp-token");
    }

    #[tokio::test]
    async fn json_variant_requires_code() {
        let response = app("http://127.0.0.1:1".to_string())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/callback")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({}).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
