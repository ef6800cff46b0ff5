use async_trait::async_trait;
use chrono::Utc;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{RenderMode, ScraperConfig};
use crate::utils::error::FetchError;

/// Pause after dismissing the consent banner so the page can settle.
const CONSENT_SETTLE: Duration = Duration::from_secs(2);

/// Fetches the fully rendered markup of a page. One attempt, no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    fn mode(&self) -> RenderMode;

    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Builds the fetcher selected by `render_mode`.
pub fn fetcher_for(config: &ScraperConfig) -> Result<Box<dyn PageFetcher>, FetchError> {
    Ok(match config.render_mode {
        RenderMode::Static => Box::new(StaticFetcher::new(config)?),
        RenderMode::Browser => Box::new(BrowserFetcher::new(config.clone())),
    })
}

pub struct StaticFetcher {
    client: Client,
}

impl StaticFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-GB,en;q=0.9"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    fn mode(&self) -> RenderMode {
        RenderMode::Static
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let start_time = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Drives a headless Chrome session so the page's own scripts run before
/// the markup is read.
pub struct BrowserFetcher {
    config: ScraperConfig,
}

impl BrowserFetcher {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn mode(&self) -> RenderMode {
        RenderMode::Browser
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let config = self.config.clone();
        let url = url.to_string();

        tokio::task::spawn_blocking(move || render_page(&config, &url))
            .await
            .map_err(|e| FetchError::Browser(format!("Browser task failed: {}", e)))?
    }
}

fn render_page(config: &ScraperConfig, url: &str) -> Result<String, FetchError> {
    let session = BrowserSession::open(config)?;

    match session.render(config, url) {
        Ok(html) => Ok(html),
        Err(e) => {
            session.capture_diagnostic(Path::new(&config.screenshot_dir));
            Err(e)
        }
    }
}

/// An open browser and tab. The tab is closed and the browser process torn
/// down when this is dropped.
struct BrowserSession {
    tab: Arc<Tab>,
    _browser: Browser,
}

impl BrowserSession {
    fn open(config: &ScraperConfig) -> Result<Self, FetchError> {
        let idle_timeout = config.consent_timeout() + config.render_timeout() + Duration::from_secs(30);

        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .idle_browser_timeout(idle_timeout)
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .map_err(|e| FetchError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| FetchError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| FetchError::Browser(format!("Failed to set user agent: {}", e)))?;

        Ok(Self {
            tab,
            _browser: browser,
        })
    }

    fn render(&self, config: &ScraperConfig, url: &str) -> Result<String, FetchError> {
        info!(%url, "Navigating to listing page");
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| FetchError::Browser(format!("Navigation failed: {}", e)))?;

        self.dismiss_consent(config);

        let selector = config.marker_selector();
        info!(%selector, "Waiting for ticket data to load");
        self.tab
            .wait_for_element_with_custom_timeout(&selector, config.render_timeout())
            .map_err(|e| {
                debug!(error = %e, "Marker wait failed");
                FetchError::RenderTimeout {
                    selector: selector.clone(),
                    timeout_secs: config.render_timeout,
                }
            })?;

        self.tab
            .get_content()
            .map_err(|e| FetchError::Browser(format!("Failed to get page content: {}", e)))
    }

    /// Clicks the cookie banner button if it shows up in time. Never fails.
    fn dismiss_consent(&self, config: &ScraperConfig) {
        let xpath = consent_button_xpath(&config.consent_button_text);
        debug!(%xpath, "Looking for cookie consent button");

        match self
            .tab
            .wait_for_xpath_with_custom_timeout(&xpath, config.consent_timeout())
        {
            Ok(button) => match button.click() {
                Ok(_) => {
                    info!("Dismissed cookie consent banner");
                    std::thread::sleep(CONSENT_SETTLE);
                }
                Err(e) => warn!(error = %e, "Consent button found but could not be clicked"),
            },
            Err(_) => info!("Cookie banner not found or already handled, continuing"),
        }
    }

    fn capture_diagnostic(&self, dir: &Path) {
        let png = match self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        {
            Ok(png) => png,
            Err(e) => {
                warn!(error = %e, "Screenshot capture failed");
                return;
            }
        };

        match save_screenshot(dir, &png) {
            Ok(path) => info!(path = %path.display(), "Saved error screenshot"),
            Err(e) => warn!(error = %e, "Failed to write screenshot"),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            debug!(error = %e, "Tab close failed");
        }
        info!("Browser closed");
    }
}

/// XPath for a button whose text contains `text`.
pub fn consent_button_xpath(text: &str) -> String {
    if text.contains('\'') {
        format!("//button[contains(text(), \"{}\")]", text)
    } else {
        format!("//button[contains(text(), '{}')]", text)
    }
}

/// Writes `png` to `dir/error_screenshot_<timestamp>.png`, creating `dir` as needed.
pub fn save_screenshot(dir: &Path, png: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("error_screenshot_{}.png", timestamp));
    std::fs::write(&path, png)?;

    Ok(path)
}
