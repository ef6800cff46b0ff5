use thiserror::Error;

/// Failures while obtaining the listing page. Always fatal to a run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {timeout_secs}s waiting for '{selector}' to render")]
    RenderTimeout { selector: String, timeout_secs: u64 },
}

/// Failures while reading the embedded listing payload. Always fatal to a run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Data block '{marker}' not found in page markup")]
    MarkerNotFound { marker: String },

    #[error("Malformed listing payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Fetch and extraction failures stop the run before anything is persisted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Fetch(_) | AppError::Extraction(_))
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::Notification(err.to_string())
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::Notification(format!("invalid address: {}", err))
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::Notification(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
