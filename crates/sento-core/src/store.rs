//! The `Store` trait: the persistence contract the crawl engine relies on.
//!
//! Implemented by `sento-db` for Postgres. Both crawl loops share one
//! implementation, so every method takes `&self` and must be safe to call
//! concurrently.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::model::{Post, Ranking, Region, RegionGeometry, RelevantTrend, Trend};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend failed to execute a query or command.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A value could not be encoded for the backend.
    #[error("cannot encode {field}: {reason}")]
    Encode { field: &'static str, reason: String },
}

/// Persistence contract for regions, trends, rankings, and posts.
///
/// Writes are idempotent where the data model asks for it: regions and
/// trends are insert-or-ignore by key, posts are de-duplicated per
/// `(post id, trend, region)` by the backend.
pub trait Store: Send + Sync {
    /// Records a region the trend source listed, without geometry. A no-op
    /// when the region is already known.
    ///
    /// Returns `true` when a new row was written.
    fn record_region(&self, region: &Region)
        -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `true` when geometry for `woeid` is already stored.
    fn region_exists(&self, woeid: i64) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Attaches geometry to a region, recording it first if needed. A no-op
    /// when the region is already enriched.
    ///
    /// Returns `true` when geometry was written.
    fn upsert_region(
        &self,
        region: &Region,
        geometry: &RegionGeometry,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Inserts a trend, keeping the stored query and url on conflict.
    fn upsert_trend(&self, trend: &Trend) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends one region's ranking batch in a single transaction, keeping
    /// the caller's positions.
    fn append_rankings(
        &self,
        rankings: &[Ranking],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Trends with at least one ranking inside the trailing `window`, joined
    /// to their enriched region.
    fn relevant_trends(
        &self,
        window: Duration,
    ) -> impl Future<Output = Result<Vec<RelevantTrend>, StoreError>> + Send;

    /// Appends a batch of posts for a `(trend, region)` pair.
    ///
    /// Returns the number of rows actually written.
    fn bulk_insert_posts(
        &self,
        posts: &[Post],
        trend_id: &str,
        woeid: i64,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Newest post id already harvested for the pair, if cursors are kept.
    fn load_cursor(
        &self,
        trend_id: &str,
        woeid: i64,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;

    /// Advances the stored cursor. Never moves it backwards.
    fn save_cursor(
        &self,
        trend_id: &str,
        woeid: i64,
        since_id: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
