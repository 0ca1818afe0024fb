//! Application context shared by both crawl loops.
//!
//! Built once at start-up from [`AppConfig`] and the concrete collaborators,
//! then handed to each loop. Nothing in the engine reaches for global state.

use std::sync::Arc;
use std::time::Duration;

use sento_core::{AppConfig, Geocoder, PostSearch, Store, TrendSource};

use crate::enrich::{GeocodeEnricher, LocationEnricher};
use crate::posts::PostExtractionLoop;
use crate::retry::RetryPolicy;
use crate::trends::TrendDiscoveryLoop;

/// Tunables for both loops.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    /// Only regions whose parent is this woeid are crawled.
    pub search_woeid: i64,
    pub trends_interval: Duration,
    pub posts_interval: Duration,
    pub empty_poll: Duration,
    pub relevant_window: Duration,
    pub group_size: usize,
    pub page_size: u32,
    pub lang: String,
    pub min_radius_km: f64,
    pub max_pages: usize,
    pub persist_cursors: bool,
    pub retry: RetryPolicy,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_woeid: config.search_woeid,
            trends_interval: Duration::from_secs(config.trends_interval_secs),
            posts_interval: Duration::from_secs(config.posts_interval_secs),
            empty_poll: Duration::from_secs(config.empty_poll_secs),
            relevant_window: Duration::from_secs(config.relevant_window_hours.saturating_mul(3600)),
            group_size: config.posts_group_size.max(1),
            page_size: config.search_page_size,
            lang: config.search_lang.clone(),
            min_radius_km: config.search_min_radius_km,
            max_pages: config.search_max_pages.max(1),
            persist_cursors: config.persist_cursors,
            retry: RetryPolicy::from_app_config(config),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            search_woeid: 1,
            trends_interval: Duration::from_secs(15 * 60),
            posts_interval: Duration::from_secs(60),
            empty_poll: Duration::from_secs(5),
            relevant_window: Duration::from_secs(12 * 3600),
            group_size: 5,
            page_size: 100,
            lang: "es".to_owned(),
            min_radius_km: 10.0,
            max_pages: 50,
            persist_cursors: false,
            retry: RetryPolicy {
                max_retries: 3,
                backoff_base_ms: 1_000,
            },
        }
    }
}

/// The store, the social-network client, the geocoder, and the settings.
///
/// `P` serves both trend discovery and post search.
pub struct AppContext<S, P, G> {
    pub store: Arc<S>,
    pub provider: Arc<P>,
    pub geocoder: Arc<G>,
    pub settings: CrawlSettings,
}

impl<S, P, G> AppContext<S, P, G>
where
    S: Store,
    P: TrendSource + PostSearch,
    G: Geocoder,
{
    pub fn new(store: S, provider: P, geocoder: G, settings: CrawlSettings) -> Self {
        Self {
            store: Arc::new(store),
            provider: Arc::new(provider),
            geocoder: Arc::new(geocoder),
            settings,
        }
    }

    #[must_use]
    pub fn trend_discovery(&self) -> TrendDiscoveryLoop<S, P, G> {
        let geocode = GeocodeEnricher::new(
            Arc::clone(&self.store),
            Arc::clone(&self.geocoder),
            self.settings.retry,
        );
        TrendDiscoveryLoop::new(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            LocationEnricher::new(geocode, self.settings.search_woeid),
            self.settings.clone(),
        )
    }

    #[must_use]
    pub fn post_extraction(&self) -> PostExtractionLoop<S, P> {
        PostExtractionLoop::new(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            self.settings.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use sento_core::{LogFormat, LogOutput};

    use super::*;

    fn app_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://example".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_output: LogOutput::Console,
            log_dir: "logs".to_string(),
            twitter_consumer_key: "key".to_string(),
            twitter_consumer_secret: "secret".to_string(),
            twitter_api_base_url: "https://api.twitter.com/".to_string(),
            nominatim_base_url: "https://nominatim.openstreetmap.org/".to_string(),
            search_woeid: 23_424_950,
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            http_timeout_secs: 30,
            user_agent: "ua".to_string(),
            geocoder_min_interval_ms: 1000,
            trends_interval_secs: 900,
            posts_interval_secs: 60,
            empty_poll_secs: 5,
            relevant_window_hours: 12,
            posts_group_size: 0,
            search_page_size: 100,
            search_lang: "ca".to_string(),
            search_min_radius_km: 10.0,
            search_max_pages: 50,
            persist_cursors: true,
            max_retries: 2,
            retry_backoff_base_ms: 250,
        }
    }

    #[test]
    fn settings_follow_app_config() {
        let settings = CrawlSettings::from_app_config(&app_config());

        assert_eq!(settings.search_woeid, 23_424_950);
        assert_eq!(settings.relevant_window, Duration::from_secs(12 * 3600));
        assert_eq!(settings.group_size, 1, "a zero group size is raised to one");
        assert_eq!(settings.lang, "ca");
        assert!(settings.persist_cursors);
        assert_eq!(settings.retry.max_retries, 2);
    }

    #[test]
    fn huge_window_saturates_instead_of_overflowing() {
        let mut config = app_config();
        config.relevant_window_hours = u64::MAX;

        let settings = CrawlSettings::from_app_config(&config);
        assert_eq!(settings.relevant_window, Duration::from_secs(u64::MAX));
    }
}
