//! Periodic trend discovery.
//!
//! Each cycle lists the regions with trend activity, keeps those under the
//! target parent region, and for every one of them concurrently fetches its
//! trends and enriches it with geometry. Every listed region is recorded
//! first, so trends and their rankings are stored whether or not the
//! enrichment succeeded.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use sento_core::{Geocoder, Ranking, Region, Store, TrendSource};

use crate::context::CrawlSettings;
use crate::enrich::{EnrichOutcome, LocationEnricher};
use crate::retry::retry_with_backoff;
use crate::shutdown::Shutdown;
use crate::CrawlError;

/// Counts for one discovery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub regions: usize,
    pub regions_failed: usize,
    pub trends: usize,
    pub enriched: usize,
}

pub struct TrendDiscoveryLoop<S, T, G> {
    store: Arc<S>,
    source: Arc<T>,
    enricher: LocationEnricher<S, G>,
    settings: CrawlSettings,
}

impl<S, T, G> TrendDiscoveryLoop<S, T, G>
where
    S: Store,
    T: TrendSource,
    G: Geocoder,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<T>,
        enricher: LocationEnricher<S, G>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            store,
            source,
            enricher,
            settings,
        }
    }

    /// Runs cycles until `shutdown` fires, sleeping `trends_interval` after
    /// each one. A failed cycle is logged and the loop carries on.
    pub async fn run(&self, shutdown: Shutdown) {
        tracing::info!(
            parent_woeid = self.settings.search_woeid,
            interval_secs = self.settings.trends_interval.as_secs(),
            "trends: loop started"
        );
        while !shutdown.is_triggered() {
            match self.run_cycle(&shutdown).await {
                Ok(summary) => tracing::info!(
                    regions = summary.regions,
                    regions_failed = summary.regions_failed,
                    trends = summary.trends,
                    enriched = summary.enriched,
                    "trends: cycle complete"
                ),
                Err(e) => tracing::error!(error = %e, "trends: cycle failed"),
            }

            tracing::info!(
                next_in_secs = self.settings.trends_interval.as_secs(),
                "trends: sleeping until next cycle"
            );
            if !shutdown.sleep(self.settings.trends_interval).await {
                break;
            }
        }
        tracing::info!("trends: loop stopped");
    }

    /// One discovery cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Source`] if the region list cannot be fetched.
    /// Failures of individual regions are logged and counted instead.
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> Result<DiscoverySummary, CrawlError> {
        tracing::info!("trends: looking for trends");
        let source = &*self.source;
        let regions = retry_with_backoff(self.settings.retry, shutdown, move || {
            source.available_regions()
        })
        .await?;
        let available = regions.len();
        let regions = self.enricher.select(regions);
        tracing::info!(
            available,
            selected = regions.len(),
            parent_woeid = self.enricher.parent_woeid(),
            "trends: fetching trends per region"
        );

        let outcomes = join_all(regions.iter().map(|region| async move {
            (region, self.process_region(region, shutdown).await)
        }))
        .await;

        let mut summary = DiscoverySummary {
            regions: regions.len(),
            ..DiscoverySummary::default()
        };
        for (region, outcome) in outcomes {
            match outcome {
                Ok((trends, enriched)) => {
                    summary.trends += trends;
                    if enriched {
                        summary.enriched += 1;
                    }
                }
                Err(e) => {
                    summary.regions_failed += 1;
                    tracing::warn!(
                        woeid = region.woeid,
                        region = %region.name,
                        error = %e,
                        "trends: region failed"
                    );
                }
            }
        }
        Ok(summary)
    }

    /// Fetches and stores one region's trends while enriching the region.
    ///
    /// Returns the number of trends stored and whether geometry was written.
    /// An enrichment failure is logged and does not fail the region.
    async fn process_region(
        &self,
        region: &Region,
        shutdown: &Shutdown,
    ) -> Result<(usize, bool), CrawlError> {
        tracing::debug!(
            woeid = region.woeid,
            region = %region.name,
            country = %region.country,
            "trends: requesting trends and region data"
        );

        if self.store.record_region(region).await? {
            tracing::debug!(woeid = region.woeid, region = %region.name, "trends: new region recorded");
        }

        let source = &*self.source;
        let woeid = region.woeid;
        let fetch_trends = retry_with_backoff(self.settings.retry, shutdown, move || {
            source.region_trends(woeid)
        });
        let (trends, enrichment) =
            tokio::join!(fetch_trends, self.enricher.enrich(region, shutdown));

        let enriched = match enrichment {
            Ok(outcome) => outcome == EnrichOutcome::Enriched,
            Err(e) => {
                tracing::warn!(
                    woeid,
                    region = %region.name,
                    error = %e,
                    "trends: region enrichment failed"
                );
                false
            }
        };

        let trends = trends?;
        let ranked_at = Utc::now().naive_utc();
        for trend in &trends {
            self.store.upsert_trend(trend).await?;
        }
        self.store
            .append_rankings(&Ranking::batch(woeid, ranked_at, &trends))
            .await?;

        tracing::debug!(
            woeid,
            region = %region.name,
            count = trends.len(),
            "trends: stored trends and rankings"
        );
        Ok((trends.len(), enriched))
    }
}
