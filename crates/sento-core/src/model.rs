//! Typed records exchanged between the crawl engine, the upstream clients,
//! and the store.
//!
//! Upstream responses are validated into these types at the client boundary;
//! nothing past that boundary handles loosely-shaped JSON except the region
//! polygon, which is passed through to PostGIS as GeoJSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place the trend provider reports activity for, keyed by its WOEID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub woeid: i64,
    pub name: String,
    pub country: String,
    pub parent_woeid: Option<i64>,
}

/// Geocoded geometry attached to a region once it is enriched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGeometry {
    pub display_name: String,
    pub longitude: f64,
    pub latitude: f64,
    /// Polygon (or other) geometry as GeoJSON. `None` when the geocoder
    /// only returned a point; the store then falls back to the point.
    pub geojson: Option<serde_json::Value>,
}

/// One geocoder search result, with coordinates still in their wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub display_name: String,
    pub lon: String,
    pub lat: String,
    pub geojson: Option<serde_json::Value>,
}

/// A topic reported as trending. `name` is the trend's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub name: String,
    pub query: String,
    pub url: Option<String>,
    pub tweet_volume: Option<i64>,
}

/// One observation of a trend's position within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    /// UTC, shared by every row of the batch it belongs to.
    pub ranked_at: NaiveDateTime,
    /// 1-based position in the provider's ordering.
    pub position: i32,
    pub woeid: i64,
    pub trend_id: String,
    pub tweet_volume: Option<i64>,
}

impl Ranking {
    /// Builds the ranking rows for one region's trend list.
    ///
    /// Positions follow the slice order and run `1..=trends.len()`.
    #[must_use]
    pub fn batch(woeid: i64, ranked_at: NaiveDateTime, trends: &[Trend]) -> Vec<Ranking> {
        (1..)
            .zip(trends)
            .map(|(position, trend)| Ranking {
                ranked_at,
                position,
                woeid,
                trend_id: trend.name.clone(),
                tweet_volume: trend.tweet_volume,
            })
            .collect()
    }
}

/// A post as returned by the search endpoint, before sanitizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPost {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

/// A sanitized post ready to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Original creation time, normalized to UTC and stored without a zone.
    pub created_at: NaiveDateTime,
    pub text: String,
}

/// A page of sanitized posts attributed to one (trend, region) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBatch {
    pub trend_id: String,
    pub woeid: i64,
    pub posts: Vec<Post>,
}

impl PostBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// A trend ranked recently in an enriched region, with the search area to
/// harvest posts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantTrend {
    pub trend_id: String,
    pub query: String,
    pub woeid: i64,
    pub region_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Circular search area in the provider's `lat,lon,radius` form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCircle {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl GeoCircle {
    /// Renders `"lat,lon,Nkm"`. The radius is rounded up to whole kilometres.
    #[must_use]
    pub fn to_param(&self) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let radius = self.radius_km.max(1.0).ceil() as u64;
        format!("{:.6},{:.6},{radius}km", self.latitude, self.longitude)
    }
}

/// Parameters of one search-page request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub geocode: GeoCircle,
    pub page_size: u32,
    pub lang: String,
    /// Only return posts newer than this id.
    pub since_id: Option<i64>,
    /// Only return posts with an id at or below this one.
    pub max_id: Option<i64>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchPage {
    pub posts: Vec<RawPost>,
    /// `max_id` for the next (older) page; `None` when the provider reports
    /// no further pages.
    pub next_max_id: Option<i64>,
}
