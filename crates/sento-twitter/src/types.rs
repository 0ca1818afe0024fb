//! Twitter v1.1 response types.
//!
//! These mirror the wire JSON loosely: every field the crawler does not
//! strictly need is optional so one odd record cannot fail a whole page.
//! [`crate::normalize`] validates them into `sento_core` records.

use serde::Deserialize;

/// `POST oauth2/token` response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}

// ---------------------------------------------------------------------------
// trends/available
// ---------------------------------------------------------------------------

/// One entry of `trends/available.json`.
#[derive(Debug, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub woeid: Option<i64>,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub parentid: Option<i64>,
}

// ---------------------------------------------------------------------------
// trends/place
// ---------------------------------------------------------------------------

/// One element of the `trends/place.json` array. The endpoint always
/// returns a single-element array for a single woeid.
#[derive(Debug, Deserialize)]
pub struct PlaceTrends {
    pub trends: Vec<WireTrend>,
}

#[derive(Debug, Deserialize)]
pub struct WireTrend {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// URL-encoded search query for the trend.
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tweet_volume: Option<i64>,
}

// ---------------------------------------------------------------------------
// search/tweets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub statuses: Vec<Status>,
    pub search_metadata: SearchMetadata,
}

#[derive(Debug, Deserialize)]
pub struct SearchMetadata {
    /// Query string for the next (older) page, e.g. `?max_id=123&q=...`.
    /// Absent on the last page.
    #[serde(default)]
    pub next_results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub id_str: Option<String>,
    /// e.g. `"Wed Oct 10 20:19:24 +0000 2018"`.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present with `tweet_mode=extended`.
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}
