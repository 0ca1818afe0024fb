//! Database operations for the `posts` table.

use chrono::{NaiveDateTime, Utc};
use sqlx::PgPool;

use sento_core::Post;

use crate::DbError;

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub trend_id: String,
    pub woeid: i64,
    pub created_at: NaiveDateTime,
    pub ingested_at: NaiveDateTime,
    pub text: String,
}

/// Bulk-inserts a batch of posts for one `(trend, region)` pair.
///
/// All rows share one `ingested_at` (UTC, no zone). Rows whose
/// `(id, trend_id, woeid)` is already stored are skipped. Returns the number
/// of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_posts(
    pool: &PgPool,
    posts: &[Post],
    trend_id: &str,
    woeid: i64,
) -> Result<u64, DbError> {
    if posts.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
    let created: Vec<NaiveDateTime> = posts.iter().map(|p| p.created_at).collect();
    let texts: Vec<String> = posts.iter().map(|p| p.text.clone()).collect();
    let ingested_at = Utc::now().naive_utc();

    let result = sqlx::query(
        "INSERT INTO posts (id, trend_id, woeid, created_at, ingested_at, text) \
         SELECT u.id, $4, $5, u.created_at, $6, u.text \
         FROM UNNEST($1::BIGINT[], $2::TIMESTAMP[], $3::TEXT[]) AS u(id, created_at, text) \
         ON CONFLICT (id, trend_id, woeid) DO NOTHING",
    )
    .bind(&ids)
    .bind(&created)
    .bind(&texts)
    .bind(trend_id)
    .bind(woeid)
    .bind(ingested_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Lists stored posts for a `(trend, region)` pair, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(
    pool: &PgPool,
    trend_id: &str,
    woeid: i64,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(
        "SELECT id, trend_id, woeid, created_at, ingested_at, text \
         FROM posts \
         WHERE trend_id = $1 AND woeid = $2 \
         ORDER BY id DESC",
    )
    .bind(trend_id)
    .bind(woeid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
