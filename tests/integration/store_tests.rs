use ticket_watcher::store::{JsonBinStore, PriceStore};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

#[tokio::test]
async fn test_read_last_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/b/{}/latest", BIN_ID)))
        .and(header("X-Master-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": { "lowest_price_eur": 199.5, "last_checked_utc": "2026-07-01T08:30:00" },
            "metadata": { "id": BIN_ID, "private": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert_eq!(store.read_last().await, Some(eur("199.5")));
}

#[tokio::test]
async fn test_read_failure_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert_eq!(store.read_last().await, None);
}

#[tokio::test]
async fn test_read_malformed_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert_eq!(store.read_last().await, None);
}

#[tokio::test]
async fn test_read_missing_field_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "record": {} })))
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert_eq!(store.read_last().await, None);
}

#[tokio::test]
async fn test_write_sends_full_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/b/{}", BIN_ID)))
        .and(header("X-Master-Key", API_KEY))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({ "lowest_price_eur": 205.1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "record": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert!(store.write_last(eur("205.10")).await);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let checked = body["last_checked_utc"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(checked).is_ok());
}

#[tokio::test]
async fn test_write_failure_is_absorbed() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert!(!store.write_last(eur("205.10")).await);
}

#[tokio::test]
async fn test_missing_credentials_make_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = get_test_config(&server.uri());
    config.store.bin_id = None;
    let store = JsonBinStore::new(&config.store).unwrap();

    assert_eq!(store.read_last().await, None);
    assert!(!store.write_last(eur("182.00")).await);
}

#[tokio::test]
async fn test_written_price_reads_back_rounded() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/b/{}", BIN_ID)))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = JsonBinStore::new(&get_test_config(&server.uri()).store).unwrap();
    assert!(store.write_last(eur("182.345")).await);

    // Serve back exactly what was written, the way the store does.
    let requests = server.received_requests().await.unwrap();
    let written: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    Mock::given(method("GET"))
        .and(path(format!("/b/{}/latest", BIN_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "record": written })))
        .mount(&server)
        .await;

    assert_eq!(store.read_last().await, Some(eur("182.35")));
}
