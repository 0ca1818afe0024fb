//! Validation of Twitter wire types into `sento_core` records.
//!
//! Locations and statuses missing an identifier or carrying an unparseable
//! timestamp are dropped with a warning; the rest of the page is kept. A
//! nameless trend cannot be dropped without shifting the ranking of the
//! trends after it, so the caller rejects the whole list instead.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use sento_core::{RawPost, Region, Trend};

use crate::types::{Location, Status, WireTrend};

/// Format of the `created_at` field on statuses.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Parses a status `created_at` string into UTC.
///
/// Returns `None` if the string does not match the expected format.
#[must_use]
pub fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, CREATED_AT_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Decodes a trend's URL-encoded query into the plain search string.
#[must_use]
pub fn decode_query(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[must_use]
pub fn normalize_location(location: Location) -> Option<Region> {
    let Some(woeid) = location.woeid else {
        tracing::warn!(name = %location.name, "dropping trend location without woeid");
        return None;
    };
    Some(Region {
        woeid,
        name: location.name,
        country: location.country,
        parent_woeid: location.parentid,
    })
}

/// Converts one trend entry, keeping the provider's query when present and
/// falling back to the trend name. Returns `None` for an entry without a name.
#[must_use]
pub fn normalize_trend(trend: WireTrend) -> Option<Trend> {
    let name = match trend.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            tracing::warn!(url = ?trend.url, "trend without a name");
            return None;
        }
    };
    let query = trend
        .query
        .as_deref()
        .map(decode_query)
        .filter(|q| !q.trim().is_empty())
        .unwrap_or_else(|| name.clone());
    Some(Trend {
        name,
        query,
        url: trend.url,
        tweet_volume: trend.tweet_volume,
    })
}

#[must_use]
pub fn normalize_status(status: Status) -> Option<RawPost> {
    let id = status
        .id
        .or_else(|| status.id_str.as_deref().and_then(|s| s.parse().ok()));
    let Some(id) = id else {
        tracing::warn!("dropping status without a usable id");
        return None;
    };
    let Some(created_at) = status.created_at.as_deref().and_then(parse_created_at) else {
        tracing::warn!(id, created_at = ?status.created_at, "dropping status with bad created_at");
        return None;
    };
    let text = status.full_text.or(status.text).unwrap_or_default();
    Some(RawPost {
        id,
        created_at,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: Option<i64>, id_str: Option<&str>, created_at: &str) -> Status {
        Status {
            id,
            id_str: id_str.map(str::to_owned),
            created_at: Some(created_at.to_owned()),
            full_text: Some("full".to_owned()),
            text: Some("short".to_owned()),
        }
    }

    #[test]
    fn parse_created_at_normalizes_offset_to_utc() {
        let dt = parse_created_at("Wed Oct 10 20:19:24 +0200 2018").unwrap();
        assert_eq!(dt.to_rfc3339(), "2018-10-10T18:19:24+00:00");
    }

    #[test]
    fn parse_created_at_rejects_garbage() {
        assert!(parse_created_at("2018-10-10").is_none());
    }

    #[test]
    fn decode_query_unescapes_hashtags_and_quotes() {
        assert_eq!(decode_query("%23Barcelona"), "#Barcelona");
        assert_eq!(decode_query("%22Real%20Madrid%22"), "\"Real Madrid\"");
    }

    #[test]
    fn trend_without_query_searches_by_name() {
        let trend = normalize_trend(WireTrend {
            name: Some("Messi".to_owned()),
            url: None,
            query: None,
            tweet_volume: None,
        })
        .unwrap();
        assert_eq!(trend.query, "Messi");
    }

    #[test]
    fn trend_without_name_is_refused() {
        assert!(normalize_trend(WireTrend {
            name: Some("  ".to_owned()),
            url: None,
            query: Some("x".to_owned()),
            tweet_volume: Some(5),
        })
        .is_none());
    }

    #[test]
    fn status_prefers_full_text_and_falls_back_to_id_str() {
        let post = normalize_status(status(None, Some("1050118621198921728"), "Wed Oct 10 20:19:24 +0000 2018"))
            .unwrap();
        assert_eq!(post.id, 1_050_118_621_198_921_728);
        assert_eq!(post.text, "full");
    }

    #[test]
    fn status_with_bad_timestamp_is_dropped() {
        assert!(normalize_status(status(Some(1), None, "yesterday")).is_none());
    }

    #[test]
    fn location_without_woeid_is_dropped() {
        let location = Location {
            name: "Nowhere".to_owned(),
            woeid: None,
            country: String::new(),
            parentid: Some(1),
        };
        assert!(normalize_location(location).is_none());
    }
}
