//! Incremental post pagination for one `(trend, region)` pair.
//!
//! [`PostPaginator`] is a small state machine: [`PostPaginator::request`]
//! says what to fetch next and [`PostPaginator::accept`] consumes the page
//! that came back. [`PostPaginator::next`] drives both against a
//! [`PostSearch`] with retries.
//!
//! A run starts at the newest posts and walks backwards with `max_id`
//! taken from the provider's next-page signal, optionally bounded below by
//! a `since_id` from an earlier run. It ends when the provider reports no
//! further page, a page comes back empty, or the page guard is reached. An
//! empty *first* page means the trend has no local posts; that is a normal
//! outcome, not an error.

use std::collections::HashSet;

use sento_core::{GeoCircle, PostBatch, PostSearch, RelevantTrend, SearchPage, SearchRequest, SourceError};

use crate::context::CrawlSettings;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::sanitize::sanitize_post;
use crate::shutdown::Shutdown;

/// Result of consuming one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Sanitized posts not yet seen in this run. May be empty when every
    /// post on the page was a repeat.
    Batch(PostBatch),
    /// The first page was empty.
    NoResults,
    /// Nothing more to fetch.
    Exhausted,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoResults,
    /// The provider reported no further page, or a later page was empty.
    EndOfResults,
    /// The page guard was reached before the end of the results.
    PageLimit,
    /// The next-page cursor did not move backwards.
    Stalled,
}

#[derive(Debug)]
pub struct PostPaginator {
    trend_id: String,
    woeid: i64,
    query: String,
    geocode: GeoCircle,
    page_size: u32,
    lang: String,
    since_id: Option<i64>,
    max_id: Option<i64>,
    max_pages: usize,
    pages: usize,
    seen: HashSet<i64>,
    newest_id: Option<i64>,
    stopped: Option<StopReason>,
}

impl PostPaginator {
    /// Starts a run for `trend`, searching the circle around its region.
    ///
    /// The radius is floored at `settings.min_radius_km` so point-only
    /// regions still cover their surroundings.
    #[must_use]
    pub fn new(trend: &RelevantTrend, settings: &CrawlSettings, since_id: Option<i64>) -> Self {
        Self {
            trend_id: trend.trend_id.clone(),
            woeid: trend.woeid,
            query: trend.query.clone(),
            geocode: GeoCircle {
                latitude: trend.latitude,
                longitude: trend.longitude,
                radius_km: trend.radius_km.max(settings.min_radius_km),
            },
            page_size: settings.page_size,
            lang: settings.lang.clone(),
            since_id,
            max_id: None,
            max_pages: settings.max_pages.max(1),
            pages: 0,
            seen: HashSet::new(),
            newest_id: None,
            stopped: None,
        }
    }

    /// The next request to send, or `None` once the run has stopped.
    #[must_use]
    pub fn request(&self) -> Option<SearchRequest> {
        if self.stopped.is_some() {
            return None;
        }
        Some(SearchRequest {
            query: self.query.clone(),
            geocode: self.geocode,
            page_size: self.page_size,
            lang: self.lang.clone(),
            since_id: self.since_id,
            max_id: self.max_id,
        })
    }

    /// Consumes the response to the last [`request`](Self::request).
    pub fn accept(&mut self, page: SearchPage) -> PageOutcome {
        if self.stopped.is_some() {
            return PageOutcome::Exhausted;
        }
        self.pages += 1;

        if page.posts.is_empty() {
            if self.pages == 1 {
                self.stopped = Some(StopReason::NoResults);
                return PageOutcome::NoResults;
            }
            self.stopped = Some(StopReason::EndOfResults);
            return PageOutcome::Exhausted;
        }

        let since_id = self.since_id;
        let mut posts = Vec::with_capacity(page.posts.len());
        for raw in page.posts {
            if since_id.is_some_and(|since| raw.id <= since) || !self.seen.insert(raw.id) {
                continue;
            }
            self.newest_id = Some(self.newest_id.map_or(raw.id, |n| n.max(raw.id)));
            posts.push(sanitize_post(raw));
        }

        self.advance(page.next_max_id);

        PageOutcome::Batch(PostBatch {
            trend_id: self.trend_id.clone(),
            woeid: self.woeid,
            posts,
        })
    }

    fn advance(&mut self, next_max_id: Option<i64>) {
        match next_max_id {
            None => self.stopped = Some(StopReason::EndOfResults),
            Some(next) if self.max_id.is_some_and(|current| next >= current) => {
                self.stopped = Some(StopReason::Stalled);
            }
            Some(next) if self.since_id.is_some_and(|since| next <= since) => {
                self.stopped = Some(StopReason::EndOfResults);
            }
            Some(_) if self.pages >= self.max_pages => {
                self.stopped = Some(StopReason::PageLimit);
            }
            Some(next) => self.max_id = Some(next),
        }
    }

    /// Fetches and consumes the next page, retrying retriable errors.
    ///
    /// # Errors
    ///
    /// Returns the [`SourceError`] of the last attempt when the page cannot
    /// be fetched. The paginator state is unchanged in that case.
    pub async fn next<P: PostSearch>(
        &mut self,
        search: &P,
        retry: RetryPolicy,
        shutdown: &Shutdown,
    ) -> Result<PageOutcome, SourceError> {
        let Some(request) = self.request() else {
            return Ok(PageOutcome::Exhausted);
        };
        let request = &request;
        let page = retry_with_backoff(retry, shutdown, move || search.search_posts(request)).await?;
        Ok(self.accept(page))
    }

    /// Highest post id yielded in this run.
    #[must_use]
    pub fn newest_id(&self) -> Option<i64> {
        self.newest_id
    }

    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// `true` when the run walked all the way down to its lower bound, so
    /// [`newest_id`](Self::newest_id) is safe to use as the next `since_id`.
    #[must_use]
    pub fn reached_end(&self) -> bool {
        matches!(
            self.stopped,
            Some(StopReason::NoResults | StopReason::EndOfResults)
        )
    }
}
