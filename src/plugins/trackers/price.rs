use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increased,
    Decreased,
    Unchanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Increased => "increased",
            ChangeType::Decreased => "decreased",
            ChangeType::Unchanged => "unchanged",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub changed: bool,
    pub change_type: ChangeType,
    /// `None` when the arithmetic would overflow
    pub difference: Option<Decimal>,
    pub percent_change: Option<f64>,
}

/// Classifies price movements and applies the alert threshold.
#[derive(Debug, Clone)]
pub struct PriceTracker {
    threshold: Decimal,
}

impl PriceTracker {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Never panics: the old price comes from outside the process and may be
    /// any representable decimal.
    pub fn compare(&self, old_price: Decimal, new_price: Decimal) -> ComparisonResult {
        let change_type = if new_price > old_price {
            ChangeType::Increased
        } else if new_price < old_price {
            ChangeType::Decreased
        } else {
            ChangeType::Unchanged
        };

        let difference = new_price.checked_sub(old_price);
        let percent_change = difference
            .and_then(|d| d.checked_div(old_price))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|pct| pct.to_f64());

        ComparisonResult {
            changed: change_type != ChangeType::Unchanged,
            change_type,
            difference,
            percent_change,
        }
    }

    /// Inclusive: a price equal to the threshold qualifies.
    pub fn meets_threshold(&self, price: Decimal) -> bool {
        price <= self.threshold
    }

    /// `€182.35`
    pub fn format(price: Decimal) -> String {
        let cents = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("€{:.2}", cents)
    }
}
