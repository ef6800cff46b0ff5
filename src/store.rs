use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::extractor::parse_decimal;
use crate::utils::error::AppError;
use crate::Result;

const MASTER_KEY_HEADER: &str = "X-Master-Key";

/// Best-effort access to the last observed price. Neither operation fails:
/// problems are logged and reported as "unavailable" / "not written".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// `None` when the store is not configured or could not be read.
    async fn read_last(&self) -> Option<Decimal>;

    /// Returns whether the record was replaced.
    async fn write_last(&self, price: Decimal) -> bool;
}

/// The record kept between runs. Every write replaces it whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPriceRecord {
    #[serde(serialize_with = "price_as_number")]
    pub lowest_price_eur: Decimal,
    pub last_checked_utc: DateTime<Utc>,
}

impl PersistedPriceRecord {
    /// Rounds `price` half away from zero to cents.
    pub fn new(price: Decimal, last_checked_utc: DateTime<Utc>) -> Self {
        Self {
            lowest_price_eur: price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            last_checked_utc,
        }
    }

    /// Reads the price out of a `{"record": {...}}` envelope.
    pub fn price_from_envelope(envelope: &serde_json::Value) -> Option<Decimal> {
        let record = envelope.get("record")?;
        let value = record
            .get("lowest_price_eur")
            .or_else(|| record.get("lowestPriceEur"))?;
        parse_decimal(value)
    }
}

/// Writes the decimal's exact text as a JSON number.
fn price_as_number<S>(price: &Decimal, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let number = serde_json::Number::from_str(&price.normalize().to_string())
        .map_err(serde::ser::Error::custom)?;
    number.serialize(serializer)
}

pub struct JsonBinStore {
    client: Client,
    api_base: String,
    bin_id: Option<String>,
    api_key: Option<String>,
}

impl JsonBinStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        let (bin_id, api_key) = match config.credentials() {
            Some((bin_id, api_key)) => (Some(bin_id.to_string()), Some(api_key.to_string())),
            None => (None, None),
        };

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bin_id,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.bin_id.is_some() && self.api_key.is_some()
    }

    fn record_url(&self, bin_id: &str) -> String {
        format!("{}/b/{}", self.api_base, bin_id)
    }

    async fn try_read(&self, bin_id: &str, api_key: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/latest", self.record_url(bin_id));
        let response = self
            .client
            .get(&url)
            .header(MASTER_KEY_HEADER, api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Store(format!("read returned HTTP {}", status.as_u16())));
        }

        let envelope: serde_json::Value = response.json().await?;
        Ok(PersistedPriceRecord::price_from_envelope(&envelope))
    }

    async fn try_write(&self, bin_id: &str, api_key: &str, record: &PersistedPriceRecord) -> Result<()> {
        let response = self
            .client
            .put(self.record_url(bin_id))
            .header(MASTER_KEY_HEADER, api_key)
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Store(format!("write returned HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceStore for JsonBinStore {
    async fn read_last(&self) -> Option<Decimal> {
        let (Some(bin_id), Some(api_key)) = (self.bin_id.as_deref(), self.api_key.as_deref()) else {
            return None;
        };

        info!("Retrieving last known price");
        match self.try_read(bin_id, api_key).await {
            Ok(Some(price)) => {
                info!(last_price = %price, "Retrieved last price");
                Some(price)
            }
            Ok(None) => {
                info!("No previous price found in store");
                None
            }
            Err(e) => {
                warn!(error = %e, "Could not retrieve last price");
                None
            }
        }
    }

    async fn write_last(&self, price: Decimal) -> bool {
        let (Some(bin_id), Some(api_key)) = (self.bin_id.as_deref(), self.api_key.as_deref()) else {
            info!("Store credentials not set, skipping update");
            return false;
        };

        let record = PersistedPriceRecord::new(price, Utc::now());
        match self.try_write(bin_id, api_key, &record).await {
            Ok(()) => {
                info!(price = %record.lowest_price_eur, "Updated stored price");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to update stored price");
                false
            }
        }
    }
}
