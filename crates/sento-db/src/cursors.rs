//! Persisted since-id cursors, one per `(trend, region)` pair.

use sqlx::PgPool;

use crate::DbError;

/// Returns the stored since-id for the pair, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_cursor(pool: &PgPool, trend_id: &str, woeid: i64) -> Result<Option<i64>, DbError> {
    let since_id = sqlx::query_scalar::<_, i64>(
        "SELECT since_id FROM trend_cursors WHERE trend_id = $1 AND woeid = $2",
    )
    .bind(trend_id)
    .bind(woeid)
    .fetch_optional(pool)
    .await?;
    Ok(since_id)
}

/// Stores `since_id` for the pair unless a newer one is already stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_cursor(
    pool: &PgPool,
    trend_id: &str,
    woeid: i64,
    since_id: i64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO trend_cursors (trend_id, woeid, since_id) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (trend_id, woeid) DO UPDATE SET \
             since_id = GREATEST(trend_cursors.since_id, EXCLUDED.since_id), \
             updated_at = NOW()",
    )
    .bind(trend_id)
    .bind(woeid)
    .bind(since_id)
    .execute(pool)
    .await?;
    Ok(())
}
