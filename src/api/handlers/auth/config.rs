//! Public provider configuration for the login page.

use axum::{
    extract::Extension,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;

use crate::auth::{casdoor::PublicConfig, config::AuthState};

#[utoipa::path(
    get,
    path = "/api/casdoor-config",
    responses (
        (status = 200, description = "Client-side provider configuration", body = PublicConfig),
    ),
    tag = "auth",
)]
/// Everything the client needs to start the provider login. The client
/// secret is never part of this payload.
#[instrument(skip_all)]
pub async fn casdoor_config(Extension(state): Extension<Arc<AuthState>>) -> Response {
    Json(
        state
            .config()
            .casdoor()
            .public(state.config().base_url()),
    )
    .into_response()
}
