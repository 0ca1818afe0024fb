//! [`Store`] implementation backed by a shared Postgres pool.

use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use sqlx::PgPool;

use sento_core::{Post, Ranking, Region, RegionGeometry, RelevantTrend, Store, StoreError, Trend};

use crate::{cursors, posts, regions, trends, DbError};

/// Postgres/PostGIS store. Cloning is cheap: clones share the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Start of the trailing `window` ending at `now`.
///
/// Fails instead of overflowing when the window does not fit the calendar.
fn window_start(now: NaiveDateTime, window: Duration) -> Result<NaiveDateTime, DbError> {
    let overflow = || DbError::Encode {
        field: "window",
        reason: format!("{}s reaches before the representable range", window.as_secs()),
    };
    let window = chrono::Duration::from_std(window).map_err(|_| overflow())?;
    now.checked_sub_signed(window).ok_or_else(overflow)
}

impl Store for PgStore {
    async fn record_region(&self, region: &Region) -> Result<bool, StoreError> {
        Ok(regions::record_region(&self.pool, region).await?)
    }

    async fn region_exists(&self, woeid: i64) -> Result<bool, StoreError> {
        Ok(regions::region_exists(&self.pool, woeid).await?)
    }

    async fn upsert_region(
        &self,
        region: &Region,
        geometry: &RegionGeometry,
    ) -> Result<bool, StoreError> {
        Ok(regions::enrich_region(&self.pool, region, geometry).await?)
    }

    async fn upsert_trend(&self, trend: &Trend) -> Result<(), StoreError> {
        Ok(trends::upsert_trend(&self.pool, trend).await?)
    }

    async fn append_rankings(&self, rankings: &[Ranking]) -> Result<(), StoreError> {
        Ok(trends::append_rankings(&self.pool, rankings).await?)
    }

    async fn relevant_trends(&self, window: Duration) -> Result<Vec<RelevantTrend>, StoreError> {
        let since = window_start(Utc::now().naive_utc(), window)?;
        let rows = trends::relevant_trends(&self.pool, since).await?;
        Ok(rows.into_iter().map(RelevantTrend::from).collect())
    }

    async fn bulk_insert_posts(
        &self,
        posts: &[Post],
        trend_id: &str,
        woeid: i64,
    ) -> Result<u64, StoreError> {
        Ok(posts::insert_posts(&self.pool, posts, trend_id, woeid).await?)
    }

    async fn load_cursor(&self, trend_id: &str, woeid: i64) -> Result<Option<i64>, StoreError> {
        Ok(cursors::load_cursor(&self.pool, trend_id, woeid).await?)
    }

    async fn save_cursor(&self, trend_id: &str, woeid: i64, since_id: i64) -> Result<(), StoreError> {
        Ok(cursors::save_cursor(&self.pool, trend_id, woeid, since_id).await?)
    }
}
