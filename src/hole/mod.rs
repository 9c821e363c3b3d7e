//! Bulletin-board records and query parameters.
//!
//! The board itself is deliberately thin: typed rows over the `holes`
//! and `comments` tables plus the paging/filter vocabulary the list
//! endpoints accept. All queries live in [`storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub mod storage;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 100;

/// An anonymously-posted entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Hole {
    pub pid: i32,
    pub text: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub reply: i32,
    pub likenum: i32,
    pub image_response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Comment {
    pub pid: i32,
    pub cid: i32,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub name: Option<String>,
    pub replied_to_cid: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HoleWithComments {
    pub hole: Hole,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub holes: Vec<Hole>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Stats {
    pub total_holes: i64,
    pub total_comments: i64,
}

/// Time window for the hot list. Entries also need
/// `reply + likenum >= 20` to qualify regardless of window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HotWindow {
    OneHour,
    SixHours,
    #[default]
    OneDay,
    OneWeek,
}

impl HotWindow {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Self::OneHour),
            "6h" => Some(Self::SixHours),
            "24h" => Some(Self::OneDay),
            "7d" => Some(Self::OneWeek),
            _ => None,
        }
    }

    #[must_use]
    pub const fn interval(self) -> &'static str {
        match self {
            Self::OneHour => "1 hour",
            Self::SixHours => "6 hours",
            Self::OneDay => "24 hours",
            Self::OneWeek => "7 days",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Or,
    And,
}

impl SearchMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "or" => Some(Self::Or),
            "and" => Some(Self::And),
            _ => None,
        }
    }

    #[must_use]
    pub const fn joiner(self) -> &'static str {
        match self {
            Self::Or => " OR ",
            Self::And => " AND ",
        }
    }
}

/// One-based page plus a clamped page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: u32,
    limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

impl Page {
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    #[must_use]
    pub const fn limit(self) -> i64 {
        self.limit as i64
    }

    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}
