//! Order holds: escrow records tying an order to withheld balances.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount, Currency, HoldId, OrderId};

/// Lifecycle of a hold. A hold is created `Active` and takes exactly one
/// terminal transition; it is never re-activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    /// Funds are withheld on the referenced accounts.
    Active,
    /// Funds were released without payment.
    Cancelled,
    /// Funds were captured.
    Completed,
}

impl HoldStatus {
    /// True once the hold has been resolved either way.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown hold status: {other}")),
        }
    }
}

/// How an active hold is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// Convert the withheld client funds into payment; return the
    /// agent's collateral.
    Capture,
    /// Return all withheld funds to their available balances.
    Release,
}

impl HoldOutcome {
    /// Terminal hold status this outcome produces.
    #[must_use]
    pub fn terminal_status(&self) -> HoldStatus {
        match self {
            Self::Capture => HoldStatus::Completed,
            Self::Release => HoldStatus::Cancelled,
        }
    }
}

/// Escrow record for one order: the client's held total, the agent's
/// collateral once assigned, and the delivery-fee portion earmarked for
/// the agent payout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHold {
    pub id: HoldId,
    pub order_id: OrderId,
    pub client_account_id: AccountId,
    pub agent_account_id: Option<AccountId>,
    pub client_hold_amount: Amount,
    pub agent_hold_amount: Amount,
    pub delivery_fees: Amount,
    pub currency: Currency,
    pub status: HoldStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderHold {
    /// Total currently withheld across both parties.
    #[must_use]
    pub fn total_withheld(&self) -> Amount {
        self.client_hold_amount + self.agent_hold_amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_map_to_terminal_statuses() {
        assert_eq!(HoldOutcome::Capture.terminal_status(), HoldStatus::Completed);
        assert_eq!(HoldOutcome::Release.terminal_status(), HoldStatus::Cancelled);
        assert!(HoldStatus::Completed.is_resolved());
        assert!(!HoldStatus::Active.is_resolved());
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [HoldStatus::Active, HoldStatus::Cancelled, HoldStatus::Completed] {
            assert_eq!(status.as_str().parse::<HoldStatus>().unwrap(), status);
        }
    }
}
