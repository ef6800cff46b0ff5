use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TARGET_URL: &str = "https://www.viagogo.com/Festival-Tickets/International-Festivals/Tomorrowland-Festival-Tickets/E-156659906?quantity=2";
pub const DEFAULT_THRESHOLD_EUR: &str = "210.00";
pub const DEFAULT_STORE_API_BASE: &str = "https://api.jsonbin.io/v3";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub target: TargetConfig,
    pub scraper: ScraperConfig,
    pub store: StoreConfig,
    pub notifications: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    pub threshold_eur: Decimal,
    pub event_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Plain GET of the page markup
    Static,
    /// Headless Chrome session that runs the page's scripts
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub render_mode: RenderMode,
    pub user_agent: String,
    /// Seconds, static fetches only
    pub request_timeout: u64,
    /// Seconds to wait for the cookie banner button
    pub consent_timeout: u64,
    /// Seconds to wait for the data block to render
    pub render_timeout: u64,
    pub data_marker: String,
    pub consent_button_text: String,
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub screenshot_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub api_base: String,
    pub bin_id: Option<String>,
    pub api_key: Option<String>,
    pub request_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
    pub from_name: String,
}

/// Sender, password and recipient, present only when all three are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailCredentials<'a> {
    pub sender: &'a str,
    pub password: &'a str,
    pub recipient: &'a str,
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout)
    }

    /// CSS selector of the embedded data block.
    pub fn marker_selector(&self) -> String {
        format!("script#{}", self.data_marker)
    }
}

impl StoreConfig {
    /// Bin id and key, present only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.bin_id.as_deref(), self.api_key.as_deref()) {
            (Some(bin_id), Some(api_key)) if !bin_id.is_empty() && !api_key.is_empty() => {
                Some((bin_id, api_key))
            }
            _ => None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl SmtpConfig {
    pub fn credentials(&self) -> Option<MailCredentials<'_>> {
        let sender = self.sender.as_deref().filter(|s| !s.is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        let recipient = self.recipient.as_deref().filter(|s| !s.is_empty())?;
        Some(MailCredentials {
            sender,
            password,
            recipient,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Layers defaults, `config/default`, `config/local`, an optional explicit
    /// file, `TICKET_WATCHER__*` variables and finally the deployment variables.
    /// Not validated here: command-line overrides still have to be applied.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("target.url", DEFAULT_TARGET_URL)?
            .set_default("target.threshold_eur", DEFAULT_THRESHOLD_EUR)?
            .set_default("target.event_name", "Tomorrowland")?
            .set_default("scraper.render_mode", "browser")?
            .set_default("scraper.user_agent", DEFAULT_USER_AGENT)?
            .set_default("scraper.request_timeout", 30)?
            .set_default("scraper.consent_timeout", 15)?
            .set_default("scraper.render_timeout", 60)?
            .set_default("scraper.data_marker", "index-data")?
            .set_default("scraper.consent_button_text", "Allow All")?
            .set_default("scraper.headless", true)?
            .set_default("scraper.screenshot_dir", ".")?
            .set_default("store.api_base", DEFAULT_STORE_API_BASE)?
            .set_default("store.request_timeout", 10)?
            .set_default("notifications.host", "smtp.gmail.com")?
            .set_default("notifications.port", 465)?
            .set_default("notifications.from_name", "Ticket Watcher")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
        }

        let running_on_render = env_value("RUNNING_ON_RENDER")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let s = builder
            .add_source(
                Environment::with_prefix("TICKET_WATCHER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("store.bin_id", env_value("JSONBIN_BIN_ID"))?
            .set_override_option("store.api_key", env_value("JSONBIN_API_KEY"))?
            .set_override_option("notifications.sender", env_value("GMAIL_SENDER_EMAIL"))?
            .set_override_option("notifications.password", env_value("GMAIL_APP_PASSWORD"))?
            .set_override_option("notifications.recipient", env_value("GMAIL_RECIPIENT_EMAIL"))?
            .set_override_option("scraper.chrome_path", env_value("CHROME_PATH"))?
            .set_override_option("scraper.headless", running_on_render.then_some(true))?
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.target.url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return Err(ConfigError::Message("Invalid target URL".into())),
        }

        if self.target.threshold_eur <= Decimal::ZERO {
            return Err(ConfigError::Message("Price threshold must be greater than 0".into()));
        }

        if self.scraper.request_timeout == 0
            || self.scraper.consent_timeout == 0
            || self.scraper.render_timeout == 0
        {
            return Err(ConfigError::Message("Scraper timeouts must be greater than 0".into()));
        }

        if self.scraper.data_marker.trim().is_empty() {
            return Err(ConfigError::Message("Scraper data_marker must not be empty".into()));
        }

        if Url::parse(&self.store.api_base).is_err() {
            return Err(ConfigError::Message("Invalid store api_base URL".into()));
        }

        if self.store.request_timeout == 0 {
            return Err(ConfigError::Message("Store request_timeout must be greater than 0".into()));
        }

        if self.notifications.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        Ok(())
    }
}

/// A fully populated configuration for unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        target: TargetConfig {
            url: "https://tickets.example.com/event/1?quantity=2".to_string(),
            threshold_eur: Decimal::new(21000, 2),
            event_name: "Test Festival".to_string(),
        },
        scraper: ScraperConfig {
            render_mode: RenderMode::Static,
            user_agent: "TestAgent/1.0".to_string(),
            request_timeout: 10,
            consent_timeout: 1,
            render_timeout: 5,
            data_marker: "index-data".to_string(),
            consent_button_text: "Allow All".to_string(),
            headless: true,
            chrome_path: None,
            screenshot_dir: ".".to_string(),
        },
        store: StoreConfig {
            api_base: DEFAULT_STORE_API_BASE.to_string(),
            bin_id: Some("bin123".to_string()),
            api_key: Some("key".to_string()),
            request_timeout: 10,
        },
        notifications: SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            sender: Some("sender@example.com".to_string()),
            password: Some("app-password".to_string()),
            recipient: Some("me@example.com".to_string()),
            from_name: "Ticket Watcher".to_string(),
        },
    }
}
