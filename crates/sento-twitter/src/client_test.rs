use reqwest::header::{HeaderMap, HeaderValue};
use sento_core::GeoCircle;

use super::*;

fn test_client(base_url: &str) -> TwitterClient {
    TwitterClient::with_base_url("key", "secret", 30, "test-agent", base_url)
        .expect("client construction should not fail")
}

fn request(since_id: Option<i64>, max_id: Option<i64>) -> SearchRequest {
    SearchRequest {
        query: "#Barcelona".to_owned(),
        geocode: GeoCircle {
            latitude: 41.38,
            longitude: 2.17,
            radius_km: 12.2,
        },
        page_size: 100,
        lang: "es".to_owned(),
        since_id,
        max_id,
    }
}

#[test]
fn build_url_keeps_base_path() {
    let client = test_client("http://localhost:9000/proxy");
    let url = client
        .build_url("1.1/trends/place.json", &[("id", "753692")])
        .unwrap();
    assert_eq!(
        url.as_str(),
        "http://localhost:9000/proxy/1.1/trends/place.json?id=753692"
    );
}

#[test]
fn search_url_encodes_query_and_geocode() {
    let client = test_client("https://api.twitter.com");
    let url = client.search_url(&request(None, None)).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert!(url.as_str().contains("q=%23Barcelona"), "hashtag should be encoded: {url}");
    assert!(pairs.contains(&("geocode".to_owned(), "41.380000,2.170000,13km".to_owned())));
    assert!(pairs.contains(&("tweet_mode".to_owned(), "extended".to_owned())));
    assert!(!pairs.iter().any(|(k, _)| k == "since_id" || k == "max_id"));
}

#[test]
fn search_url_carries_cursor_bounds() {
    let client = test_client("https://api.twitter.com");
    let url = client.search_url(&request(Some(10), Some(99))).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("since_id".to_owned(), "10".to_owned())));
    assert!(pairs.contains(&("max_id".to_owned(), "99".to_owned())));
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = TwitterClient::with_base_url("k", "s", 30, "ua", "not a url");
    assert!(matches!(result, Err(TwitterError::InvalidBaseUrl { .. })));
}

#[test]
fn retry_after_prefers_reset_header() {
    let mut headers = HeaderMap::new();
    headers.insert("x-rate-limit-reset", HeaderValue::from_static("1000120"));
    headers.insert("retry-after", HeaderValue::from_static("5"));
    assert_eq!(retry_after_secs(&headers, 1_000_000), 120);
}

#[test]
fn retry_after_falls_back_to_retry_after_then_default() {
    let mut headers = HeaderMap::new();
    headers.insert("retry-after", HeaderValue::from_static("7"));
    assert_eq!(retry_after_secs(&headers, 0), 7);
    assert_eq!(retry_after_secs(&HeaderMap::new(), 0), DEFAULT_RETRY_AFTER_SECS);
}

#[test]
fn retry_after_is_never_zero() {
    let mut headers = HeaderMap::new();
    headers.insert("x-rate-limit-reset", HeaderValue::from_static("10"));
    assert_eq!(retry_after_secs(&headers, 50), 1);
}

#[test]
fn debug_output_redacts_credentials() {
    let rendered = format!("{:?}", test_client("https://api.twitter.com"));
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("[redacted]"));
}
