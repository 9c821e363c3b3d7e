//! Gated board routes: thin handlers over [`crate::hole::storage`].

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::hole::{
    storage, Hole, HoleWithComments, HotWindow, Page, SearchMode, SearchResult, Stats,
    DEFAULT_PAGE_LIMIT,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    fn page(&self) -> Page {
        Page::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HotParams {
    pub time_filter: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub mode: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HolesResponse {
    pub holes: Vec<Hole>,
}

fn db_error(err: &sqlx::Error) -> Response {
    error!("Database query failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Database error" })),
    )
        .into_response()
}

fn bad_request(reason: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": reason })),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/holes",
    params(ListParams),
    responses (
        (status = 200, description = "Latest holes, newest first", body = HolesResponse),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("session_token" = [])),
    tag = "holes",
)]
/// List the latest holes.
#[instrument(skip(pool))]
pub async fn list(pool: Extension<PgPool>, Query(params): Query<ListParams>) -> Response {
    match storage::list_latest(&pool.0, params.page()).await {
        Ok(holes) => Json(HolesResponse { holes }).into_response(),
        Err(err) => db_error(&err),
    }
}

#[utoipa::path(
    get,
    path = "/api/holes/hot",
    params(HotParams),
    responses (
        (status = 200, description = "Hot holes in the selected window", body = HolesResponse),
        (status = 400, description = "Unknown time filter"),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("session_token" = [])),
    tag = "holes",
)]
/// List hot holes, filtered by `time_filter` (`1h`, `6h`, `24h`, `7d`).
#[instrument(skip(pool))]
pub async fn hot(pool: Extension<PgPool>, Query(params): Query<HotParams>) -> Response {
    let window = match params.time_filter.as_deref() {
        None => HotWindow::default(),
        Some(filter) => match HotWindow::parse(filter) {
            Some(window) => window,
            None => return bad_request("Invalid time filter"),
        },
    };
    let page = Page::new(
        params.page.unwrap_or(1),
        params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    );

    match storage::list_hot(&pool.0, window, page).await {
        Ok(holes) => Json(HolesResponse { holes }).into_response(),
        Err(err) => db_error(&err),
    }
}

#[utoipa::path(
    get,
    path = "/api/holes/search",
    params(SearchParams),
    responses (
        (status = 200, description = "Matching holes with paging metadata", body = SearchResult),
        (status = 400, description = "Missing keywords or unknown mode"),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("session_token" = [])),
    tag = "holes",
)]
/// Search hole text by keywords, combined with `or` (default) or `and`.
#[instrument(skip(pool))]
pub async fn search(pool: Extension<PgPool>, Query(params): Query<SearchParams>) -> Response {
    let keywords: Vec<String> = params
        .keywords
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(ToString::to_string)
        .collect();
    if keywords.is_empty() {
        return bad_request("Keywords are required");
    }

    let mode = match params.mode.as_deref() {
        None => SearchMode::default(),
        Some(mode) => match SearchMode::parse(mode) {
            Some(mode) => mode,
            None => return bad_request("Invalid search mode"),
        },
    };
    let page = Page::new(
        params.page.unwrap_or(1),
        params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    );

    match storage::search(&pool.0, &keywords, mode, page).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => db_error(&err),
    }
}

#[utoipa::path(
    get,
    path = "/api/holes/{pid}",
    params(("pid" = i32, Path, description = "Hole id")),
    responses (
        (status = 200, description = "Hole with its comments", body = HoleWithComments),
        (status = 404, description = "No hole with that id"),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("session_token" = [])),
    tag = "holes",
)]
/// Fetch one hole and its comments, oldest comment first.
#[instrument(skip(pool))]
pub async fn get(pool: Extension<PgPool>, Path(pid): Path<i32>) -> Response {
    match storage::get_by_pid(&pool.0, pid).await {
        Ok(Some(hole)) => Json(hole).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Hole not found" })),
        )
            .into_response(),
        Err(err) => db_error(&err),
    }
}

#[utoipa::path(
    get,
    path = "/api/stats",
    responses (
        (status = 200, description = "Board totals", body = Stats),
        (status = 401, description = "Missing or invalid session token"),
    ),
    security(("session_token" = [])),
    tag = "holes",
)]
/// Total hole and comment counts.
#[instrument(skip(pool))]
pub async fn stats(pool: Extension<PgPool>) -> Response {
    match storage::get_stats(&pool.0).await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => db_error(&err),
    }
}
