use ticket_watcher::{AlertStatus, PriceMonitor, RunOutcome};
use ticket_watcher::plugins::trackers::ChangeType;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

async fn mount_page(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/event/E-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_last_price(server: &MockServer, price: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/b/{}/latest", BIN_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": { "lowest_price_eur": price, "last_checked_utc": "2026-07-01T08:30:00" }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_below_threshold() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        listing_page(json!([
            { "rawPrice": 240.0, "availableTickets": 2 },
            { "rawPrice": 180.0, "availableTickets": 0 },
            { "rawPrice": 205.55, "availableTickets": 1 },
        ])),
    )
    .await;
    mount_last_price(&server, 220.0).await;
    Mock::given(method("PUT"))
        .and(path(format!("/b/{}", BIN_ID)))
        .and(body_partial_json(json!({ "lowest_price_eur": 205.55 })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = get_test_config(&server.uri());
    let report = PriceMonitor::from_config(&config).unwrap().run().await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.current_price(), Some(eur("205.55")));
    assert_eq!(report.last_price, Some(eur("220")));
    assert_eq!(report.change, Some(ChangeType::Decreased));
    assert!(report.persisted);
    // No mail credentials configured, so the alert is skipped rather than failed.
    assert!(matches!(report.alert, AlertStatus::Skipped { .. }));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_full_run_above_threshold_still_persists() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        listing_page(json!([{ "rawPrice": 260.0, "availableTickets": 3 }])),
    )
    .await;
    mount_last_price(&server, 260.0).await;
    Mock::given(method("PUT"))
        .and(path(format!("/b/{}", BIN_ID)))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = get_test_config(&server.uri());
    let report = PriceMonitor::from_config(&config).unwrap().run().await;

    assert!(report.is_completed());
    assert_eq!(report.change, Some(ChangeType::Unchanged));
    assert_eq!(report.alert, AlertStatus::NotNeeded);
}

#[tokio::test]
async fn test_blocked_page_aborts_without_write() {
    let server = MockServer::start().await;
    mount_page(&server, "<html><body>Please verify you are human</body></html>".to_string()).await;
    mount_last_price(&server, 220.0).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = get_test_config(&server.uri());
    let report = PriceMonitor::from_config(&config).unwrap().run().await;

    assert!(matches!(report.outcome, RunOutcome::Aborted { .. }));
    assert!(!report.persisted);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_page_error_status_aborts_without_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/event/E-1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = get_test_config(&server.uri());
    config.store.api_key = None;
    let report = PriceMonitor::from_config(&config).unwrap().run().await;

    assert!(matches!(report.outcome, RunOutcome::Aborted { ref reason } if reason.contains("503")));
    assert_eq!(report.last_price, None);
}
