//! Database operations for `trends` and `rankings`.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use sento_core::{Ranking, RelevantTrend, Trend};

use crate::DbError;

/// A row from the `rankings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankingRow {
    pub id: i64,
    pub ranked_at: NaiveDateTime,
    pub ranking_no: i32,
    pub woeid: i64,
    pub trend_id: String,
    pub tweet_volume: Option<i64>,
}

/// Result row of the relevant-trends join.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RelevantTrendRow {
    pub trend_id: String,
    pub query_str: String,
    pub woeid: i64,
    pub region_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl From<RelevantTrendRow> for RelevantTrend {
    fn from(row: RelevantTrendRow) -> Self {
        RelevantTrend {
            trend_id: row.trend_id,
            query: row.query_str,
            woeid: row.woeid,
            region_name: row.region_name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius_km: row.radius_km,
        }
    }
}

/// Inserts a trend or refreshes the observation fields of an existing one.
///
/// `query_str` and `url` are never overwritten: the first writer wins. A
/// reported `tweet_volume` replaces the stored one; `NULL` keeps it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_trend(pool: &PgPool, trend: &Trend) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO trends (id, query_str, url, tweet_volume) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE SET \
             tweet_volume = COALESCE(EXCLUDED.tweet_volume, trends.tweet_volume), \
             last_seen_at = NOW()",
    )
    .bind(&trend.name)
    .bind(&trend.query)
    .bind(&trend.url)
    .bind(trend.tweet_volume)
    .execute(pool)
    .await?;
    Ok(())
}

/// Appends a ranking batch in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing from the batch is
/// kept in that case.
pub async fn append_rankings(pool: &PgPool, rankings: &[Ranking]) -> Result<(), DbError> {
    if rankings.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for ranking in rankings {
        sqlx::query(
            "INSERT INTO rankings (ranked_at, ranking_no, woeid, trend_id, tweet_volume) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ranking.ranked_at)
        .bind(ranking.position)
        .bind(ranking.woeid)
        .bind(&ranking.trend_id)
        .bind(ranking.tweet_volume)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Lists the rankings recorded for a region, newest batch first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_rankings(pool: &PgPool, woeid: i64) -> Result<Vec<RankingRow>, DbError> {
    let rows = sqlx::query_as::<_, RankingRow>(
        "SELECT id, ranked_at, ranking_no, woeid, trend_id, tweet_volume \
         FROM rankings \
         WHERE woeid = $1 \
         ORDER BY ranked_at DESC, ranking_no",
    )
    .bind(woeid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Trends ranked at or after `since` in an enriched region.
///
/// The search radius is the length of the longest line from the region's
/// point to its geometry, in kilometres. It is `0` for point-only regions;
/// callers apply their own lower bound.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn relevant_trends(
    pool: &PgPool,
    since: NaiveDateTime,
) -> Result<Vec<RelevantTrendRow>, DbError> {
    // Grouping by the two primary keys makes every other selected column of
    // trends and regions functionally dependent.
    let rows = sqlx::query_as::<_, RelevantTrendRow>(
        "SELECT t.id AS trend_id, \
                t.query_str AS query_str, \
                r.woeid AS woeid, \
                r.name AS region_name, \
                ST_Y(r.coords) AS latitude, \
                ST_X(r.coords) AS longitude, \
                ST_Length(ST_LongestLine(r.coords, r.the_geom)::geography) / 1000.0::FLOAT8 \
                    AS radius_km \
         FROM rankings k \
         JOIN trends t ON k.trend_id = t.id \
         JOIN regions r ON k.woeid = r.woeid \
         WHERE k.ranked_at >= $1 AND r.the_geom IS NOT NULL \
         GROUP BY t.id, r.woeid \
         ORDER BY t.id, r.woeid",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
