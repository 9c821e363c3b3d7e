use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod auth;
pub mod health;
pub mod holes;

/// Structured error body, shared by every failing route.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
