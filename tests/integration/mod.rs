// Shared fixtures for the integration tests

pub mod monitor_tests;
pub mod store_tests;

use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use ticket_watcher::config::{
    AppConfig, RenderMode, ScraperConfig, SmtpConfig, StoreConfig, TargetConfig,
};

pub const BIN_ID: &str = "bin-test";
pub const API_KEY: &str = "master-key";
pub const TEST_USER_AGENT: &str = "TicketWatcher-Test/1.0";

pub fn eur(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Test configuration pointing every HTTP collaborator at `server_uri`.
pub fn get_test_config(server_uri: &str) -> AppConfig {
    AppConfig {
        target: TargetConfig {
            url: format!("{}/event/E-1?quantity=2", server_uri),
            threshold_eur: eur("210.00"),
            event_name: "Test Festival".to_string(),
        },
        scraper: ScraperConfig {
            render_mode: RenderMode::Static,
            user_agent: TEST_USER_AGENT.to_string(),
            request_timeout: 5,
            consent_timeout: 1,
            render_timeout: 5,
            data_marker: "index-data".to_string(),
            consent_button_text: "Allow All".to_string(),
            headless: true,
            chrome_path: None,
            screenshot_dir: ".".to_string(),
        },
        store: StoreConfig {
            api_base: server_uri.to_string(),
            bin_id: Some(BIN_ID.to_string()),
            api_key: Some(API_KEY.to_string()),
            request_timeout: 5,
        },
        notifications: SmtpConfig {
            host: "smtp.invalid".to_string(),
            port: 465,
            sender: None,
            password: None,
            recipient: None,
            from_name: "Ticket Watcher".to_string(),
        },
    }
}

/// A listing page with the embedded data block.
pub fn listing_page(items: serde_json::Value) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>Test Festival Tickets</title></head>
<body>
  <div id="root"></div>
  <script id="index-data" type="application/json">{}</script>
</body>
</html>"#,
        json!({ "grid": { "items": items, "totalCount": 3 } })
    )
}
