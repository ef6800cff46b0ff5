pub mod cli;
pub mod config;
pub mod extractor;
pub mod monitor;
pub mod plugins;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::{AppConfig, RenderMode};
pub use extractor::{Listing, PriceExtractor, PriceSnapshot};
pub use monitor::{AlertStatus, PriceMonitor, RunOutcome, RunReport};
pub use scraper::PageFetcher;
pub use store::{PersistedPriceRecord, PriceStore};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
