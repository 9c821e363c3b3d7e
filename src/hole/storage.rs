//! Parameterized Postgres queries for the board.
//!
//! Every query binds its inputs; the only dynamic SQL is the search
//! predicate, built from a fixed template per keyword count.

use sqlx::PgPool;

use super::{
    Comment, Hole, HoleWithComments, HotWindow, Page, SearchMode, SearchResult, Stats,
};

const HOLE_COLUMNS: &str =
    "pid, text, type, created_at, reply, likenum, image_response";
const HOTNESS_THRESHOLD: i32 = 20;

/// Latest holes, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_latest(pool: &PgPool, page: Page) -> Result<Vec<Hole>, sqlx::Error> {
    let sql = format!(
        "SELECT {HOLE_COLUMNS} FROM holes ORDER BY pid DESC LIMIT $1 OFFSET $2"
    );
    sqlx::query_as::<_, Hole>(&sql)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await
}

/// Hot holes inside the given time window, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn list_hot(
    pool: &PgPool,
    window: HotWindow,
    page: Page,
) -> Result<Vec<Hole>, sqlx::Error> {
    let sql = format!(
        "SELECT {HOLE_COLUMNS} FROM holes \
         WHERE (reply + likenum) >= $1 AND created_at >= NOW() - $2::interval \
         ORDER BY pid DESC LIMIT $3 OFFSET $4"
    );
    sqlx::query_as::<_, Hole>(&sql)
        .bind(HOTNESS_THRESHOLD)
        .bind(window.interval())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await
}

/// `text ILIKE $n` predicate joined by the search mode, one placeholder
/// per keyword. Placeholders start at `$1`.
fn search_predicate(keyword_count: usize, mode: SearchMode) -> String {
    (1..=keyword_count)
        .map(|n| format!("text ILIKE ${n}"))
        .collect::<Vec<_>>()
        .join(mode.joiner())
}

fn like_pattern(keyword: &str) -> String {
    // Escape LIKE metacharacters so keywords match literally.
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Keyword search with a total count and `has_more` paging metadata.
///
/// # Errors
///
/// Returns an error if either query fails.
pub async fn search(
    pool: &PgPool,
    keywords: &[String],
    mode: SearchMode,
    page: Page,
) -> Result<SearchResult, sqlx::Error> {
    if keywords.is_empty() {
        return Ok(SearchResult {
            holes: Vec::new(),
            total: 0,
            has_more: false,
        });
    }

    let predicate = search_predicate(keywords.len(), mode);
    let next = keywords.len() + 1;
    let after = keywords.len() + 2;
    let sql = format!(
        "SELECT {HOLE_COLUMNS} FROM holes WHERE {predicate} \
         ORDER BY pid DESC LIMIT ${next} OFFSET ${after}"
    );
    let count_sql = format!("SELECT COUNT(*) FROM holes WHERE {predicate}");

    let mut query = sqlx::query_as::<_, Hole>(&sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for keyword in keywords {
        let pattern = like_pattern(keyword);
        query = query.bind(pattern.clone());
        count_query = count_query.bind(pattern);
    }

    let holes = query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;
    let total = count_query.fetch_one(pool).await?;
    let has_more = page.offset() + (holes.len() as i64) < total;

    Ok(SearchResult {
        holes,
        total,
        has_more,
    })
}

/// One hole with its comments, oldest comment first.
///
/// # Errors
///
/// Returns an error if either query fails.
pub async fn get_by_pid(
    pool: &PgPool,
    pid: i32,
) -> Result<Option<HoleWithComments>, sqlx::Error> {
    let sql = format!("SELECT {HOLE_COLUMNS} FROM holes WHERE pid = $1");
    let Some(hole) = sqlx::query_as::<_, Hole>(&sql)
        .bind(pid)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT pid, cid, text, created_at, name, replied_to_cid \
         FROM comments WHERE pid = $1 ORDER BY created_at ASC",
    )
    .bind(pid)
    .fetch_all(pool)
    .await?;

    Ok(Some(HoleWithComments { hole, comments }))
}

/// # Errors
///
/// Returns an error if either count fails.
pub async fn get_stats(pool: &PgPool) -> Result<Stats, sqlx::Error> {
    let total_holes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM holes")
        .fetch_one(pool)
        .await?;
    let total_comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;

    Ok(Stats {
        total_holes,
        total_comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_uses_one_placeholder_per_keyword() {
        assert_eq!(search_predicate(1, SearchMode::Or), "text ILIKE $1");
        assert_eq!(
            search_predicate(2, SearchMode::Or),
            "text ILIKE $1 OR text ILIKE $2"
        );
        assert_eq!(
            search_predicate(3, SearchMode::And),
            "text ILIKE $1 AND text ILIKE $2 AND text ILIKE $3"
        );
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[tokio::test]
    async fn empty_keyword_search_short_circuits() {
        // connect_lazy never touches the network, so an empty search must
        // not issue a query at all for this to return.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unreachable")
            .expect("lazy pool");
        let result = search(&pool, &[], SearchMode::Or, Page::default())
            .await
            .expect("short circuit");
        assert_eq!(result.total, 0);
        assert!(result.holes.is_empty());
        assert!(!result.has_more);
    }
}
