//! Integration tests for `OpenDataClient::fetch_all`.
//!
//! Uses `wiremock` to stand up a local HTTP server for each test so no real
//! network traffic is made.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sanisette_tui::api::{FacilitySource, OpenDataClient};
use sanisette_tui::config::DataConfig;
use sanisette_tui::error::FetchError;
use sanisette_tui::normalize::normalize_batch;

const SEARCH_PATH: &str = "/api/records/1.0/search/";

fn client_for(server: &MockServer) -> OpenDataClient {
    let config = DataConfig {
        endpoint: format!("{}{}", server.uri(), SEARCH_PATH),
        dataset: "sanisettesparis".to_string(),
        rows: 100,
        timeout_seconds: 5,
    };
    OpenDataClient::new(&config).expect("failed to build test client")
}

#[tokio::test]
async fn fetch_all_returns_raw_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("dataset", "sanisettesparis"))
        .and(query_param("rows", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nhits": 2,
            "records": [
                {
                    "recordid": "a1",
                    "fields": {
                        "geo_point_2d": [48.8566, 2.3522],
                        "adresse": "PLACE DE L'HOTEL DE VILLE",
                        "acces_pmr": "Oui"
                    }
                },
                {
                    "recordid": "b2",
                    "fields": { "geo_point_2d": 48.8 }
                }
            ]
        })))
        .mount(&server)
        .await;

    let records = client_for(&server).fetch_all().await.unwrap();
    assert_eq!(records.len(), 2);

    let normalized = normalize_batch(&records);
    assert_eq!(normalized.facilities.len(), 1);
    assert_eq!(normalized.rejected.len(), 1);
    assert_eq!(normalized.facilities[0].id.to_string(), "a1");
}

#[tokio::test]
async fn missing_records_key_is_an_empty_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nhits": 0})))
        .mount(&server)
        .await;

    let records = client_for(&server).fetch_all().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_all().await.unwrap_err();
    assert!(
        matches!(err, FetchError::UnexpectedStatus { status: 503, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn non_json_body_is_a_body_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Body(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let config = DataConfig {
        endpoint: "http://127.0.0.1:1/api/records/1.0/search/".to_string(),
        dataset: "sanisettesparis".to_string(),
        rows: 10,
        timeout_seconds: 2,
    };
    let client = OpenDataClient::new(&config).unwrap();
    let err = client.fetch_all().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {err:?}");
}
