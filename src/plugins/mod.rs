pub mod notifiers;
pub mod trackers;
pub mod traits;

pub use notifiers::EmailNotifier;
pub use trackers::PriceTracker;
pub use traits::NotifierPlugin;
