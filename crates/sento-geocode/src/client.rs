//! HTTP client for a Nominatim-compatible `search` endpoint.
//!
//! The public instance allows at most one request per second per client,
//! so requests made through one [`NominatimClient`] are spaced by a
//! configurable minimum interval, shared across every task using it.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use sento_core::{AppConfig, GeocodeCandidate, Geocoder, SourceError};

use crate::error::GeocodeError;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct NominatimResult {
    display_name: String,
    lon: String,
    lat: String,
    #[serde(default)]
    geojson: Option<serde_json::Value>,
}

impl From<NominatimResult> for GeocodeCandidate {
    fn from(r: NominatimResult) -> Self {
        GeocodeCandidate {
            display_name: r.display_name,
            lon: r.lon,
            lat: r.lat,
            geojson: r.geojson,
        }
    }
}

#[derive(Debug)]
pub struct NominatimClient {
    client: Client,
    base_url: Url,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimClient {
    /// Creates a client pointed at the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, GeocodeError> {
        Self::with_base_url(
            user_agent,
            timeout_secs,
            Duration::from_secs(1),
            DEFAULT_BASE_URL,
        )
    }

    /// # Errors
    ///
    /// See [`NominatimClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, GeocodeError> {
        Self::with_base_url(
            &config.user_agent,
            config.http_timeout_secs,
            Duration::from_millis(config.geocoder_min_interval_ms),
            &config.nominatim_base_url,
        )
    }

    /// Creates a client with a custom base URL and request spacing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`GeocodeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        user_agent: &str,
        timeout_secs: u64,
        min_interval: Duration,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            min_interval,
            last_request: Mutex::new(None),
        })
    }

    /// Searches for a city within a country, asking for polygon geometry and
    /// a single candidate.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Throttled`] on HTTP 429/403.
    /// - [`GeocodeError::Http`] / [`GeocodeError::Status`] on transport or
    ///   status failures.
    /// - [`GeocodeError::Deserialize`] if the body is not a result array.
    pub async fn search_city(
        &self,
        city: &str,
        country: &str,
    ) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        let url = self.search_url(city, country)?;
        let context = format!("search(city={city}, country={country})");

        self.wait_turn().await;
        tracing::debug!(city, country, "geocoding region");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                .max(1);
            return Err(GeocodeError::Throttled { retry_after_secs });
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                context,
            });
        }

        let body = response.text().await?;
        let results: Vec<NominatimResult> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context,
                source: e,
            })?;
        Ok(results.into_iter().map(GeocodeCandidate::from).collect())
    }

    fn search_url(&self, city: &str, country: &str) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("city", city)
            .append_pair("country", country)
            .append_pair("polygon_geojson", "1")
            .append_pair("limit", "1");
        Ok(url)
    }

    /// Sleeps until `min_interval` has passed since the previous request.
    /// The lock is held across the sleep so concurrent callers queue up.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimClient {
    async fn lookup(&self, city: &str, country: &str) -> Result<Vec<GeocodeCandidate>, SourceError> {
        Ok(self.search_city(city, country).await?)
    }
}
