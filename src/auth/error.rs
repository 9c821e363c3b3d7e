use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use super::{casdoor, session};

/// Authentication failure taxonomy.
///
/// Every variant is recovered at the API boundary and rendered as a
/// structured `401` body; none of them escapes as a fault.
/// `UpstreamUnavailable` looks identical to `InvalidCredential` to the
/// caller (fail closed) but is logged separately for operability.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    MissingCredential(&'static str),
    #[error("{0}")]
    InvalidCredential(&'static str),
    #[error("Session token expired")]
    ExpiredToken,
    #[error("Invalid session token")]
    MalformedToken,
    #[error("Identity provider unavailable")]
    UpstreamUnavailable,
}

impl From<session::Error> for AuthError {
    fn from(err: session::Error) -> Self {
        match err {
            session::Error::Expired => Self::ExpiredToken,
            _ => Self::MalformedToken,
        }
    }
}

impl From<casdoor::Error> for AuthError {
    fn from(err: casdoor::Error) -> Self {
        match err {
            casdoor::Error::Url(_)
            | casdoor::Error::Exchange(_)
            | casdoor::Error::Unavailable(_) => Self::UpstreamUnavailable,
            casdoor::Error::NoAccessToken => Self::InvalidCredential("No access token returned"),
            casdoor::Error::Rejected(reason) => Self::InvalidCredential(reason),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn all_variants_map_to_401() {
        let errors = [
            AuthError::MissingCredential("Missing API key"),
            AuthError::InvalidCredential("Invalid API key"),
            AuthError::ExpiredToken,
            AuthError::MalformedToken,
            AuthError::UpstreamUnavailable,
        ];
        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn session_errors_fold_into_taxonomy() {
        assert_eq!(
            AuthError::from(session::Error::Expired),
            AuthError::ExpiredToken
        );
        assert_eq!(
            AuthError::from(session::Error::InvalidSignature),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(session::Error::TokenFormat),
            AuthError::MalformedToken
        );
    }

    #[test]
    fn provider_errors_fold_into_taxonomy() {
        use crate::auth::casdoor;

        assert_eq!(
            AuthError::from(casdoor::Error::NoAccessToken),
            AuthError::InvalidCredential("No access token returned")
        );
        assert_eq!(
            AuthError::from(casdoor::Error::Rejected("Invalid identity token")),
            AuthError::InvalidCredential("Invalid identity token")
        );
    }
}
