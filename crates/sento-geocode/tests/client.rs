//! Integration tests for `NominatimClient` using wiremock HTTP mocks.

use std::time::Duration;

use sento_core::{Geocoder, SourceError};
use sento_geocode::NominatimClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> NominatimClient {
    NominatimClient::with_base_url("sento-test", 30, Duration::ZERO, base_url)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn lookup_returns_candidate_with_geometry() {
    let server = MockServer::start().await;

    let body = serde_json::json!([{
        "place_id": 197_873_532,
        "osm_type": "relation",
        "display_name": "Barcelona, Barcelonès, Barcelona, Catalunya, 08001, España",
        "lat": "41.3828939",
        "lon": "2.1774322",
        "class": "boundary",
        "type": "administrative",
        "geojson": {
            "type": "Polygon",
            "coordinates": [[[2.05, 41.32], [2.23, 41.32], [2.23, 41.47], [2.05, 41.32]]]
        }
    }]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("format", "json"))
        .and(query_param("city", "Barcelona"))
        .and(query_param("country", "Spain"))
        .and(query_param("polygon_geojson", "1"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let candidates = client.lookup("Barcelona", "Spain").await.expect("should parse");

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].lat, "41.3828939");
    assert_eq!(candidates[0].lon, "2.1774322");
    assert_eq!(
        candidates[0].geojson.as_ref().and_then(|g| g.get("type")),
        Some(&serde_json::json!("Polygon"))
    );
}

#[tokio::test]
async fn no_match_is_an_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let candidates = client.lookup("Atlantis", "Spain").await.expect("empty is valid");
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn throttling_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.lookup("Barcelona", "Spain").await.unwrap_err();
    assert!(
        matches!(err, SourceError::RateLimited { retry_after_secs: 2 }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn candidate_without_coordinates_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "display_name": "Barcelona" }])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.lookup("Barcelona", "Spain").await.unwrap_err();
    assert!(matches!(err, SourceError::Malformed { .. }), "got {err:?}");
}
