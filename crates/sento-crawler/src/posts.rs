//! Periodic post extraction for recently ranked trends.
//!
//! Each cycle reads the relevant trends (ranked inside the trailing window
//! in an enriched region), polling at a short interval while there are
//! none, then harvests them in fixed-size groups: the trends of one group
//! are paginated concurrently and the group is awaited in full before the
//! next one starts.

use std::sync::Arc;

use sento_core::{PostSearch, RelevantTrend, Store};

use crate::context::CrawlSettings;
use crate::fanout::run_in_groups;
use crate::paginator::{PageOutcome, PostPaginator};
use crate::shutdown::Shutdown;
use crate::CrawlError;

/// Counts for one extraction cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub trends: usize,
    pub groups: usize,
    pub failed: usize,
    pub posts_stored: u64,
}

pub struct PostExtractionLoop<S, P> {
    store: Arc<S>,
    search: Arc<P>,
    settings: CrawlSettings,
}

impl<S, P> PostExtractionLoop<S, P>
where
    S: Store,
    P: PostSearch,
{
    pub fn new(store: Arc<S>, search: Arc<P>, settings: CrawlSettings) -> Self {
        Self {
            store,
            search,
            settings,
        }
    }

    /// Runs cycles until `shutdown` fires, sleeping `posts_interval` after
    /// each completed cycle. A failed cycle is logged and the loop carries on.
    pub async fn run(&self, shutdown: Shutdown) {
        tracing::info!(
            group_size = self.settings.group_size,
            window_hours = self.settings.relevant_window.as_secs() / 3600,
            "posts: loop started"
        );
        while !shutdown.is_triggered() {
            match self.wait_for_relevant(&shutdown).await {
                Ok(Some(trends)) => {
                    let summary = self.harvest_all(&trends, &shutdown).await;
                    tracing::info!(
                        trends = summary.trends,
                        groups = summary.groups,
                        failed = summary.failed,
                        posts_stored = summary.posts_stored,
                        "posts: cycle complete"
                    );
                }
                Ok(None) => break,
                Err(e) => tracing::error!(error = %e, "posts: cycle failed"),
            }

            if !shutdown.sleep(self.settings.posts_interval).await {
                break;
            }
        }
        tracing::info!("posts: loop stopped");
    }

    /// Polls the store every `empty_poll` until it reports relevant trends.
    ///
    /// Returns `None` if shutdown fires while waiting.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Store`] if the query fails.
    pub async fn wait_for_relevant(
        &self,
        shutdown: &Shutdown,
    ) -> Result<Option<Vec<RelevantTrend>>, CrawlError> {
        loop {
            let trends = self.store.relevant_trends(self.settings.relevant_window).await?;
            if !trends.is_empty() {
                return Ok(Some(trends));
            }
            tracing::debug!(
                retry_in_secs = self.settings.empty_poll.as_secs(),
                "posts: no relevant trends yet"
            );
            if !shutdown.sleep(self.settings.empty_poll).await {
                return Ok(None);
            }
        }
    }

    /// One extraction cycle over whatever is relevant right now, without
    /// waiting for trends to appear.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Store`] if the relevant-trends query fails.
    pub async fn run_cycle(&self, shutdown: &Shutdown) -> Result<ExtractionSummary, CrawlError> {
        let trends = self.store.relevant_trends(self.settings.relevant_window).await?;
        if trends.is_empty() {
            tracing::info!("posts: no relevant trends");
            return Ok(ExtractionSummary::default());
        }
        Ok(self.harvest_all(&trends, shutdown).await)
    }

    async fn harvest_all(&self, trends: &[RelevantTrend], shutdown: &Shutdown) -> ExtractionSummary {
        tracing::info!(
            trends = trends.len(),
            group_size = self.settings.group_size,
            "posts: extracting posts for each trend and region"
        );
        let groups = run_in_groups(trends, self.settings.group_size, shutdown, |trend| {
            self.harvest_trend(trend, shutdown)
        })
        .await;

        let mut summary = ExtractionSummary {
            trends: trends.len(),
            groups: groups.len(),
            ..ExtractionSummary::default()
        };
        for (trend, outcome) in groups.into_iter().flatten() {
            match outcome {
                Ok(stored) => summary.posts_stored += stored,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        trend = %trend.trend_id,
                        woeid = trend.woeid,
                        region = %trend.region_name,
                        error = %e,
                        "posts: trend harvest failed"
                    );
                }
            }
        }
        summary
    }

    /// Paginates one trend in one region and stores every batch.
    ///
    /// With cursor persistence on, the run starts from the stored since-id
    /// and advances it only when the run reached the end of the results.
    /// Returns the number of posts written.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Source`] if a page cannot be fetched after
    /// retries, or [`CrawlError::Store`] if a write fails. Batches stored
    /// before the failure are kept.
    pub async fn harvest_trend(
        &self,
        trend: &RelevantTrend,
        shutdown: &Shutdown,
    ) -> Result<u64, CrawlError> {
        let since_id = if self.settings.persist_cursors {
            self.store.load_cursor(&trend.trend_id, trend.woeid).await?
        } else {
            None
        };

        tracing::debug!(
            trend = %trend.trend_id,
            region = %trend.region_name,
            since_id,
            "posts: extracting posts"
        );
        let mut paginator = PostPaginator::new(trend, &self.settings, since_id);
        let mut stored = 0u64;

        while !shutdown.is_triggered() {
            match paginator
                .next(&*self.search, self.settings.retry, shutdown)
                .await?
            {
                PageOutcome::Batch(batch) => {
                    if batch.is_empty() {
                        continue;
                    }
                    let written = self
                        .store
                        .bulk_insert_posts(&batch.posts, &batch.trend_id, batch.woeid)
                        .await?;
                    stored += written;
                    tracing::debug!(
                        trend = %trend.trend_id,
                        region = %trend.region_name,
                        page = paginator.pages_fetched(),
                        count = batch.len(),
                        written,
                        "posts: stored batch"
                    );
                }
                PageOutcome::NoResults => {
                    tracing::debug!(
                        trend = %trend.trend_id,
                        region = %trend.region_name,
                        query = %trend.query,
                        "posts: search returned no results"
                    );
                    break;
                }
                PageOutcome::Exhausted => break,
            }
        }

        if let Some(reason) = paginator.stop_reason().filter(|_| !paginator.reached_end()) {
            tracing::debug!(trend = %trend.trend_id, ?reason, "posts: run stopped early");
        }

        if self.settings.persist_cursors && paginator.reached_end() {
            if let Some(newest) = paginator.newest_id() {
                self.store
                    .save_cursor(&trend.trend_id, trend.woeid, newest)
                    .await?;
            }
        }
        Ok(stored)
    }
}
