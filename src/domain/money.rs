//! Monetary types shared by the ledger, holds, and pricing.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount represented as a Decimal for precision.
pub type Amount = Decimal;

/// ISO 4217 currency code with knowledge of its minor-unit precision.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors; codes are normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Create a currency from its ISO code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    /// Central African CFA franc, the marketplace's default currency.
    #[must_use]
    pub fn xaf() -> Self {
        Self("XAF".to_string())
    }

    /// Get the currency code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit digits (2 for most currencies, 0 for the
    /// CFA francs and yen).
    #[must_use]
    pub fn minor_units(&self) -> u32 {
        match self.0.as_str() {
            "XAF" | "XOF" | "JPY" | "KRW" | "UGX" => 0,
            "BHD" | "KWD" | "TND" => 3,
            _ => 2,
        }
    }

    /// Round an amount to this currency's precision (banker's rounding
    /// is deliberately avoided; half-up matches invoice arithmetic).
    #[must_use]
    pub fn round(&self, amount: Amount) -> Amount {
        amount.round_dp_with_strategy(
            self.minor_units(),
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        )
    }

    /// Largest difference two equal totals may show after independent
    /// rounding: half of one minor unit.
    #[must_use]
    pub fn tolerance(&self) -> Amount {
        Amount::new(5, self.minor_units() + 1)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn codes_are_normalized() {
        assert_eq!(Currency::new("xaf").as_str(), "XAF");
    }

    #[test]
    fn xaf_has_no_minor_units() {
        let xaf = Currency::xaf();
        assert_eq!(xaf.minor_units(), 0);
        assert_eq!(xaf.round(dec!(199.5)), dec!(200));
        assert_eq!(xaf.tolerance(), dec!(0.5));
    }

    #[test]
    fn usd_rounds_to_cents() {
        let usd = Currency::new("USD");
        assert_eq!(usd.round(dec!(10.005)), dec!(10.01));
        assert_eq!(usd.tolerance(), dec!(0.005));
    }
}
