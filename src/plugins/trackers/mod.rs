// Tracker implementations
pub mod price;

pub use price::{ChangeType, ComparisonResult, PriceTracker};
