//! Request gate.
//!
//! Pure over (request, secret, now): every request is classified by
//! path, and protected paths require a fully-authenticated session
//! token. API paths answer 401 JSON on failure; page paths redirect the
//! browser to `/login`. No server-side session state is consulted.

use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{config::AuthState, error::AuthError, session::SessionClaims};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Served without any credential.
    Public,
    /// Data route, 401 JSON when the session token fails.
    ProtectedApi,
    /// Browser route, redirect to `/login` when the session token fails.
    ProtectedPage,
}

const PUBLIC_PREFIXES: &[&str] = &[
    "/health",
    "/api/auth",
    "/api/casdoor-config",
    "/swagger-ui",
    "/api-docs",
    "/login",
    "/callback",
    "/favicon.ico",
];

#[must_use]
pub fn classify(path: &str) -> PathClass {
    if PUBLIC_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
    {
        return PathClass::Public;
    }

    if path == "/api" || path.starts_with("/api/") {
        PathClass::ProtectedApi
    } else {
        PathClass::ProtectedPage
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<SessionClaims, AuthError> {
    let token =
        bearer_token(headers).ok_or(AuthError::MissingCredential("Missing session token"))?;
    let claims = state.codec().verify(&token)?;
    if claims.fully_authenticated() {
        Ok(claims)
    } else {
        Err(AuthError::InvalidCredential("Session not fully verified"))
    }
}

/// Middleware applied inside the extension layers, so `Arc<AuthState>`
/// is already present on the request.
pub async fn gate(mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let class = classify(&path);
    if class == PathClass::Public {
        return next.run(request).await;
    }

    // Missing state means the router was miswired; fail closed.
    let Some(state) = request.extensions().get::<Arc<AuthState>>().cloned() else {
        warn!("auth state missing from request extensions");
        return deny(class, AuthError::InvalidCredential("Invalid session token"));
    };

    match authenticate(&state, request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            debug!(%path, error = %err, "request rejected by gate");
            deny(class, err)
        }
    }
}

fn deny(class: PathClass, err: AuthError) -> Response {
    match class {
        PathClass::ProtectedPage => Redirect::temporary("/login").into_response(),
        _ => err.into_response(),
    }
}
