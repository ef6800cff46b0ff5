use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::plugins::trackers::price::ChangeType;

/// Everything a notifier needs to tell the user about a price at or below
/// the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub event_name: String,
    pub url: String,
    pub price: Decimal,
    pub threshold: Decimal,
    pub last_price: Option<Decimal>,
    pub change: Option<ChangeType>,
    pub observed_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationResult {
    Sent { message_id: Option<String> },
    /// Not attempted, e.g. credentials missing
    Skipped { reason: String },
}

/// Trait for implementing notification methods
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    fn plugin_type(&self) -> &'static str;

    /// Single delivery attempt. Errors are reported, never retried.
    async fn notify(&self, alert: &PriceAlert) -> crate::Result<NotificationResult>;
}
