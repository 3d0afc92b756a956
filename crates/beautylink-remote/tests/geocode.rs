//! Integration tests for `GeocodeClient` using wiremock HTTP mocks.

use beautylink_remote::{GeocodeClient, RemoteError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> GeocodeClient {
    GeocodeClient::new(base_url, 30, "beautylink-test/0.1")
        .expect("client construction should not fail")
}

#[tokio::test]
async fn search_returns_parsed_places() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "place_id": 1,
            "display_name": "Akwa, Douala I, Wouri, Littoral, Cameroun",
            "lat": "4.0511",
            "lon": "9.7000",
            "address": { "suburb": "Akwa", "city": "Douala", "country_code": "cm" }
        },
        {
            "place_id": 2,
            "display_name": "Bastos, Yaoundé, Mfoundi, Centre, Cameroun",
            "lat": "3.8900",
            "lon": "11.5100",
            "address": { "neighbourhood": "Bastos", "city": "Yaoundé" }
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Akwa"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("limit", "5"))
        .and(query_param("countrycodes", "cm"))
        .and(header("user-agent", "beautylink-test/0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let results = client.search("  Akwa ").await.expect("should parse places");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].district.as_deref(), Some("Akwa"));
    assert_eq!(results[0].city.as_deref(), Some("Douala"));
    assert_eq!(results[0].location_label(), "Akwa, Douala");
    assert_eq!(results[1].location_label(), "Bastos, Yaoundé");
}

#[tokio::test]
async fn search_skips_places_with_unusable_coordinates() {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        { "display_name": "Broken", "lat": "", "lon": "9.7" },
        { "display_name": "Bonamoussadi, Douala", "lat": "4.09", "lon": "9.74" }
    ]);

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let results = test_client(&server.uri())
        .search("Bonamoussadi")
        .await
        .expect("should parse places");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].display_name, "Bonamoussadi, Douala");
}

#[tokio::test]
async fn search_with_no_matches_returns_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let results = test_client(&server.uri())
        .search("Atlantis")
        .await
        .expect("empty list is a valid answer");
    assert!(results.is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected_without_a_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .search("   ")
        .await
        .expect_err("blank query must fail");
    assert!(matches!(err, RemoteError::InvalidInput(_)));
}

#[tokio::test]
async fn server_error_maps_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .search("Akwa")
        .await
        .expect_err("503 should fail");
    assert!(matches!(err, RemoteError::Http(_)));
}

#[tokio::test]
async fn malformed_body_returns_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .search("Akwa")
        .await
        .expect_err("html should not decode");
    match err {
        RemoteError::Deserialize { context, .. } => assert!(context.contains("Akwa")),
        other => panic!("expected Deserialize, got {other:?}"),
    }
}
