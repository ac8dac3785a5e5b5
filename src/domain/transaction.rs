//! Ledger transaction types and their balance effects.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountId, Amount, OrderId, TransactionId};

/// Kind of movement a ledger transaction represents.
///
/// Amounts are recorded positive; the type determines which balance
/// buckets move and in which direction. `Adjustment` is the one signed
/// exception, reserved for manual corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// External funds credited to the available balance.
    Deposit,
    /// Funds leaving the platform; debits the available balance.
    Withdrawal,
    /// Moves funds from available to withheld on the same account.
    Hold,
    /// Moves funds from withheld back to available.
    Release,
    /// Account-to-account movement; debits the source's available balance.
    Transfer,
    /// A realized charge; debits the available balance.
    Payment,
    /// Money returned to a payer; credits the available balance.
    Refund,
    /// Platform fee; debits the available balance.
    Fee,
    /// Signed manual correction on the available balance.
    Adjustment,
}

/// Signed deltas a transaction applies to the two balance buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEffect {
    pub available: Amount,
    pub withheld: Amount,
}

impl BalanceEffect {
    /// Net change to the account total (available + withheld).
    #[must_use]
    pub fn net(&self) -> Amount {
        self.available + self.withheld
    }
}

impl TransactionType {
    /// Balance deltas for a transaction of this type carrying `amount`.
    ///
    /// `amount` is positive for every type except [`Adjustment`],
    /// which passes its sign through.
    ///
    /// [`Adjustment`]: TransactionType::Adjustment
    #[must_use]
    pub fn effect(&self, amount: Amount) -> BalanceEffect {
        let zero = Decimal::ZERO;
        match self {
            Self::Deposit | Self::Refund => BalanceEffect {
                available: amount,
                withheld: zero,
            },
            Self::Withdrawal | Self::Payment | Self::Transfer | Self::Fee => BalanceEffect {
                available: -amount,
                withheld: zero,
            },
            Self::Hold => BalanceEffect {
                available: -amount,
                withheld: amount,
            },
            Self::Release => BalanceEffect {
                available: amount,
                withheld: -amount,
            },
            Self::Adjustment => BalanceEffect {
                available: amount,
                withheld: zero,
            },
        }
    }

    /// True when the type credits the account rather than debiting it.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::Refund | Self::Release)
    }

    /// Stable storage identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Hold => "hold",
            Self::Release => "release",
            Self::Transfer => "transfer",
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::Fee => "fee",
            Self::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "hold" => Ok(Self::Hold),
            "release" => Ok(Self::Release),
            "transfer" => Ok(Self::Transfer),
            "payment" => Ok(Self::Payment),
            "refund" => Ok(Self::Refund),
            "fee" => Ok(Self::Fee),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Immutable, append-only ledger record.
///
/// Created by the ledger store on behalf of the hold manager or the
/// reconciliation adapter; never mutated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    /// Internal reference, typically the order that caused the movement.
    pub reference_id: Option<OrderId>,
    /// Payment-provider transaction id; unique when present and used by
    /// the reconciliation adapter to refuse double application.
    pub external_reference: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn hold_moves_between_buckets_with_zero_net() {
        let effect = TransactionType::Hold.effect(dec!(25));
        assert_eq!(effect.available, dec!(-25));
        assert_eq!(effect.withheld, dec!(25));
        assert_eq!(effect.net(), dec!(0));
    }

    #[test]
    fn release_mirrors_hold() {
        let hold = TransactionType::Hold.effect(dec!(40));
        let release = TransactionType::Release.effect(dec!(40));
        assert_eq!(hold.available + release.available, dec!(0));
        assert_eq!(hold.withheld + release.withheld, dec!(0));
    }

    #[test]
    fn deposit_credits_and_payment_debits_available() {
        assert_eq!(TransactionType::Deposit.effect(dec!(10)).net(), dec!(10));
        assert_eq!(TransactionType::Payment.effect(dec!(10)).net(), dec!(-10));
    }

    #[test]
    fn adjustment_passes_sign_through() {
        assert_eq!(
            TransactionType::Adjustment.effect(dec!(-3)).available,
            dec!(-3)
        );
    }

    #[test]
    fn type_round_trips_through_storage_form() {
        for ty in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::Hold,
            TransactionType::Release,
            TransactionType::Transfer,
            TransactionType::Payment,
            TransactionType::Refund,
            TransactionType::Fee,
            TransactionType::Adjustment,
        ] {
            assert_eq!(ty.as_str().parse::<TransactionType>().unwrap(), ty);
        }
    }
}
