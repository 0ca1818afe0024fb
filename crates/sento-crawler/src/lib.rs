//! Crawl orchestration engine.
//!
//! Two long-running loops share one [`Store`](sento_core::Store):
//! [`TrendDiscoveryLoop`] records what is trending per region and enriches
//! regions with geometry; [`PostExtractionLoop`] harvests posts for the
//! trends that were ranked recently.

pub mod context;
pub mod enrich;
pub mod fanout;
pub mod paginator;
pub mod posts;
pub mod retry;
pub mod sanitize;
pub mod shutdown;
pub mod trends;

#[cfg(test)]
pub(crate) mod testing;

use sento_core::{SourceError, StoreError};
use thiserror::Error;

pub use context::{AppContext, CrawlSettings};
pub use enrich::{EnrichOutcome, GeocodeEnricher, LocationEnricher};
pub use paginator::{PageOutcome, PostPaginator};
pub use posts::{ExtractionSummary, PostExtractionLoop};
pub use retry::RetryPolicy;
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use trends::{DiscoverySummary, TrendDiscoveryLoop};

/// Failure of one crawl sub-task or cycle.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
