//! Delivery fee composition, isolated from ledger and workflow logic so
//! fee rules can change without touching either.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Amount, Currency};

/// Country-level fee schedule. Values mirror the delivery configuration
/// table of the marketplace; defaults are the XAF fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub currency: Currency,
    pub normal_base_fee: Amount,
    pub fast_base_fee: Amount,
    pub per_km_fee: Amount,
    pub fast_delivery_enabled: bool,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            currency: Currency::xaf(),
            normal_base_fee: Decimal::new(1000, 0),
            fast_base_fee: Decimal::new(1500, 0),
            per_km_fee: Decimal::new(200, 0),
            fast_delivery_enabled: false,
        }
    }
}

/// Failures of the fee quote function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("fast delivery is not enabled for this fee schedule")]
    FastUnavailable,

    #[error("distance must be non-negative, got {0}")]
    NegativeDistance(Amount),
}

/// Priced delivery fee, broken down the way the order stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFeeQuote {
    pub base_fee: Amount,
    pub per_km_fee: Amount,
}

impl DeliveryFeeQuote {
    /// Base plus distance component.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.base_fee + self.per_km_fee
    }
}

/// Price a delivery: flat base fee by speed class plus a per-kilometer
/// component, rounded to the schedule currency's precision.
pub fn quote(
    distance_km: Amount,
    fast: bool,
    schedule: &FeeSchedule,
) -> Result<DeliveryFeeQuote, PricingError> {
    if distance_km < Decimal::ZERO {
        return Err(PricingError::NegativeDistance(distance_km));
    }
    if fast && !schedule.fast_delivery_enabled {
        return Err(PricingError::FastUnavailable);
    }

    let base_fee = if fast {
        schedule.fast_base_fee
    } else {
        schedule.normal_base_fee
    };
    let per_km_fee = schedule.currency.round(schedule.per_km_fee * distance_km);

    Ok(DeliveryFeeQuote {
        base_fee,
        per_km_fee,
    })
}
