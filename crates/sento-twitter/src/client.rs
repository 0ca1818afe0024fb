//! HTTP client for the Twitter v1.1 REST API.
//!
//! Authenticates app-only: consumer credentials are exchanged for a bearer
//! token on first use, the token is cached, and it is discarded when a
//! request comes back 401 so the next call fetches a fresh one.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use sento_core::{AppConfig, RawPost, Region, SearchPage, SearchRequest, Trend};

use crate::error::TwitterError;
use crate::normalize::{normalize_location, normalize_status, normalize_trend};
use crate::pagination::extract_next_max_id;
use crate::types::{Location, PlaceTrends, SearchResponse, TokenResponse};

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";
const DEFAULT_USER_AGENT: &str = "sento-crawler/0.1 (trend-harvesting)";

/// Used when a 429 carries neither `x-rate-limit-reset` nor `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Client for the Twitter v1.1 REST API.
///
/// Use [`TwitterClient::new`] for production or
/// [`TwitterClient::with_base_url`] to point at a mock server in tests.
pub struct TwitterClient {
    client: Client,
    consumer_key: String,
    consumer_secret: String,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url.as_str())
            .field("consumer_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        consumer_key: &str,
        consumer_secret: &str,
        timeout_secs: u64,
    ) -> Result<Self, TwitterError> {
        Self::with_base_url(
            consumer_key,
            consumer_secret,
            timeout_secs,
            DEFAULT_USER_AGENT,
            DEFAULT_BASE_URL,
        )
    }

    /// Builds a client from the application configuration.
    ///
    /// # Errors
    ///
    /// See [`TwitterClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, TwitterError> {
        Self::with_base_url(
            &config.twitter_consumer_key,
            &config.twitter_consumer_secret,
            config.http_timeout_secs,
            &config.user_agent,
            &config.twitter_api_base_url,
        )
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`TwitterError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`TwitterError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        consumer_key: &str,
        consumer_secret: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, TwitterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so that `join` appends to the base path
        // instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| TwitterError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            consumer_key: consumer_key.to_owned(),
            consumer_secret: consumer_secret.to_owned(),
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Lists every location that currently has trend data.
    ///
    /// # Errors
    ///
    /// - [`TwitterError::RateLimited`] on HTTP 429.
    /// - [`TwitterError::Http`] / [`TwitterError::Status`] on transport or
    ///   status failures.
    /// - [`TwitterError::Deserialize`] if the body is not a location array.
    pub async fn trend_locations(&self) -> Result<Vec<Region>, TwitterError> {
        let url = self.build_url("1.1/trends/available.json", &[])?;
        let locations: Vec<Location> = self.get_json(url, "trends/available").await?;
        Ok(locations.into_iter().filter_map(normalize_location).collect())
    }

    /// Returns the current trends for a woeid, in the provider's order.
    ///
    /// # Errors
    ///
    /// As [`TwitterClient::trend_locations`], plus [`TwitterError::Malformed`]
    /// when an entry has no name.
    pub async fn place_trends(&self, woeid: i64) -> Result<Vec<Trend>, TwitterError> {
        let url = self.build_url("1.1/trends/place.json", &[("id", &woeid.to_string())])?;
        let context = format!("trends/place(id={woeid})");
        let places: Vec<PlaceTrends> = self.get_json(url, &context).await?;
        let Some(place) = places.into_iter().next() else {
            return Ok(Vec::new());
        };
        // Positions are taken from this order, so a hole cannot be skipped.
        place
            .trends
            .into_iter()
            .map(normalize_trend)
            .collect::<Option<Vec<Trend>>>()
            .ok_or_else(|| TwitterError::Malformed {
                context,
                reason: "trend list contains an entry without a name".to_owned(),
            })
    }

    /// Fetches one page of search results.
    ///
    /// # Errors
    ///
    /// As [`TwitterClient::trend_locations`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchPage, TwitterError> {
        let url = self.search_url(request)?;
        let context = format!("search/tweets(q={})", request.query);
        let response: SearchResponse = self.get_json(url, &context).await?;

        let posts: Vec<RawPost> = response
            .statuses
            .into_iter()
            .filter_map(normalize_status)
            .collect();
        let next_max_id = extract_next_max_id(response.search_metadata.next_results.as_deref());

        Ok(SearchPage { posts, next_max_id })
    }

    fn search_url(&self, request: &SearchRequest) -> Result<Url, TwitterError> {
        let geocode = request.geocode.to_param();
        let count = request.page_size.to_string();
        let since_id = request.since_id.map(|id| id.to_string());
        let max_id = request.max_id.map(|id| id.to_string());

        let mut params: Vec<(&str, &str)> = vec![
            ("q", request.query.as_str()),
            ("geocode", geocode.as_str()),
            ("count", count.as_str()),
            ("lang", request.lang.as_str()),
            ("result_type", "recent"),
            ("tweet_mode", "extended"),
        ];
        if let Some(since_id) = since_id.as_deref() {
            params.push(("since_id", since_id));
        }
        if let Some(max_id) = max_id.as_deref() {
            params.push(("max_id", max_id));
        }
        self.build_url("1.1/search/tweets.json", &params)
    }

    /// Joins `path` onto the base URL and appends percent-encoded query
    /// parameters.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, TwitterError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TwitterError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Returns the cached bearer token, exchanging the consumer credentials
    /// for one if none is cached.
    async fn bearer_token(&self) -> Result<String, TwitterError> {
        if let Some(token) = self.token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.token.write().await;
        // Another task may have filled the slot while we waited for the lock.
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let url = self.build_url("oauth2/token", &[])?;
        tracing::debug!("requesting app-only bearer token");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs =
                    retry_after_secs(response.headers(), Utc::now().timestamp());
                return Err(TwitterError::RateLimited { retry_after_secs });
            }
            status if status.is_server_error() => {
                return Err(TwitterError::Status {
                    status: status.as_u16(),
                    context: "oauth2/token".to_owned(),
                });
            }
            status if !status.is_success() => {
                return Err(TwitterError::Auth(format!("token endpoint returned {status}")));
            }
            _ => {}
        }

        let body = response.text().await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TwitterError::Deserialize {
                context: "oauth2/token".to_owned(),
                source: e,
            })?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(TwitterError::Auth(format!(
                "unexpected token type '{}'",
                token.token_type
            )));
        }

        *slot = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    /// Sends an authenticated GET and parses the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, TwitterError> {
        let token = self.bearer_token().await?;
        let response = self.client.get(url).bearer_auth(token).send().await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.token.write().await.take();
                return Err(TwitterError::Unauthorized(context.to_owned()));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs =
                    retry_after_secs(response.headers(), Utc::now().timestamp());
                return Err(TwitterError::RateLimited { retry_after_secs });
            }
            status if !status.is_success() => {
                return Err(TwitterError::Status {
                    status: status.as_u16(),
                    context: context.to_owned(),
                });
            }
            _ => {}
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TwitterError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

/// Seconds to wait after a 429.
///
/// Prefers `x-rate-limit-reset` (epoch seconds at which the window resets),
/// then `Retry-After` (delta seconds), then a fixed default. Never returns 0.
pub(crate) fn retry_after_secs(headers: &HeaderMap, now_epoch: i64) -> u64 {
    let header_num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    let secs = header_num("x-rate-limit-reset")
        .map(|reset| reset - now_epoch)
        .or_else(|| header_num(RETRY_AFTER.as_str()))
        .map_or(DEFAULT_RETRY_AFTER_SECS, |s| u64::try_from(s).unwrap_or(0));
    secs.max(1)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
