//! Seams for the upstream collaborators: the trend/search provider and the
//! geocoder.
//!
//! Client crates map their own error types onto [`SourceError`] so the
//! engine can decide what to retry without knowing the wire protocol.

use std::future::Future;

use thiserror::Error;

use crate::model::{GeocodeCandidate, Region, SearchPage, SearchRequest, Trend};

#[derive(Debug, Error)]
pub enum SourceError {
    /// The provider asked us to slow down.
    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Timeout, connection failure, or 5xx.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// The response did not have the expected shape.
    #[error("malformed response for {context}: {reason}")]
    Malformed { context: String, reason: String },

    /// The provider refused the request (auth, 4xx, API-level error).
    #[error("upstream rejected request: {0}")]
    Rejected(String),
}

impl SourceError {
    /// `true` for errors worth retrying after a back-off delay.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. } | SourceError::Transient(_)
        )
    }
}

/// Trend discovery endpoints of the social-network provider.
pub trait TrendSource: Send + Sync {
    /// Every region currently reporting trend activity.
    fn available_regions(&self)
        -> impl Future<Output = Result<Vec<Region>, SourceError>> + Send;

    /// The region's current trends, in the provider's ranking order.
    fn region_trends(
        &self,
        woeid: i64,
    ) -> impl Future<Output = Result<Vec<Trend>, SourceError>> + Send;
}

/// Post search endpoint of the social-network provider.
pub trait PostSearch: Send + Sync {
    /// Fetches one page of posts. An empty page is a valid response.
    fn search_posts(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchPage, SourceError>> + Send;
}

/// Place-name geocoding.
pub trait Geocoder: Send + Sync {
    /// Looks up a city within a country, returning at most one candidate
    /// with polygon geometry. An empty result is valid.
    fn lookup(
        &self,
        city: &str,
        country: &str,
    ) -> impl Future<Output = Result<Vec<GeocodeCandidate>, SourceError>> + Send;
}
