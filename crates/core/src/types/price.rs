//! Type-safe price representation using decimal arithmetic.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A storefront price in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in dollars, not cents.
    pub amount: Decimal,
}

impl Price {
    /// Parse a decimal amount as Shopify's REST API sends it (`"19.50"`).
    ///
    /// Returns `None` for empty or non-numeric input.
    #[must_use]
    pub fn parse(amount: &str) -> Option<Self> {
        let amount = amount.trim();
        if amount.is_empty() {
            return None;
        }

        Decimal::from_str(amount)
            .or_else(|_| Decimal::from_scientific(amount))
            .ok()
            .map(|amount| Self { amount })
    }

    /// Format for display with two decimal places (e.g., `$19.50`).
    #[must_use]
    pub fn display(&self) -> String {
        let mut rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        format!("${rounded}")
    }
}
