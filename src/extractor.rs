use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::utils::error::ExtractionError;

/// JSON pointer to the listings sequence inside the embedded payload.
pub const LISTINGS_POINTER: &str = "/grid/items";

/// One ticket offer read from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub raw_price: Decimal,
    pub available_tickets: u64,
}

impl Listing {
    /// Returns `None` when the entry has no usable price. A missing or
    /// negative ticket count is read as zero.
    pub fn from_value(item: &serde_json::Value) -> Option<Self> {
        let raw_price = parse_decimal(item.get("rawPrice")?)?;
        let available_tickets = item
            .get("availableTickets")
            .and_then(parse_count)
            .unwrap_or(0);

        Some(Listing {
            raw_price,
            available_tickets,
        })
    }

    pub fn is_candidate(&self) -> bool {
        self.available_tickets > 0 && self.raw_price > Decimal::ZERO
    }
}

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// `None` when no listing qualified
    pub lowest_price: Option<Decimal>,
    pub observed_at_utc: DateTime<Utc>,
    pub total_listings: usize,
    pub candidates: usize,
}

impl PriceSnapshot {
    pub fn is_found(&self) -> bool {
        self.lowest_price.is_some()
    }
}

/// Reads a JSON number or numeric string as a decimal.
pub(crate) fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        // Going through the textual form keeps 182.35 as 182.35.
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn parse_count(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    if let Some(n) = value.as_i64() {
        return Some(n.max(0) as u64);
    }
    value.as_f64().map(|f| if f > 0.0 { f.ceil() as u64 } else { 0 })
}

/// Minimum price over listings with tickets available. The first of several
/// equal minima is kept.
pub fn lowest_price<'a, I>(listings: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut lowest: Option<Decimal> = None;
    for listing in listings.into_iter().filter(|l| l.is_candidate()) {
        match lowest {
            Some(current) if listing.raw_price >= current => {}
            _ => lowest = Some(listing.raw_price),
        }
    }
    lowest
}

pub struct PriceExtractor {
    marker: String,
}

impl PriceExtractor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Pulls the text of the `<script id="{marker}">` block out of `markup`.
    pub fn find_payload(&self, markup: &str) -> Result<String, ExtractionError> {
        let not_found = || ExtractionError::MarkerNotFound {
            marker: self.marker.clone(),
        };

        let selector = Selector::parse(&format!("script#{}", self.marker)).map_err(|_| not_found())?;
        let document = Html::parse_document(markup);
        let element = document.select(&selector).next().ok_or_else(not_found)?;

        Ok(element.text().collect::<String>())
    }

    pub fn extract(&self, markup: &str) -> Result<PriceSnapshot, ExtractionError> {
        self.extract_at(markup, Utc::now())
    }

    pub fn extract_at(
        &self,
        markup: &str,
        observed_at_utc: DateTime<Utc>,
    ) -> Result<PriceSnapshot, ExtractionError> {
        let payload = self.find_payload(markup)?;
        let data: serde_json::Value = serde_json::from_str(payload.trim())?;

        let items = data.pointer(LISTINGS_POINTER).and_then(|items| items.as_array());
        let total_listings = items.map_or(0, Vec::len);
        let listings: Vec<Listing> = items
            .map(|items| items.iter().filter_map(Listing::from_value).collect())
            .unwrap_or_default();
        let candidates = listings.iter().filter(|l| l.is_candidate()).count();
        let lowest_price = lowest_price(&listings);

        debug!(
            total_listings,
            candidates,
            lowest = ?lowest_price,
            "Parsed listing payload"
        );

        Ok(PriceSnapshot {
            lowest_price,
            observed_at_utc,
            total_listings,
            candidates,
        })
    }
}
