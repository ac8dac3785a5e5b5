//! Balance accounts: one per (user, currency) pair.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{AccountId, Amount, Currency, UserId};

/// A user's balance account in a single currency.
///
/// Both balances are non-negative at all times; the ledger store is the
/// only writer. Accounts are never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency: Currency,
    pub available_balance: Amount,
    pub withheld_balance: Amount,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Total funds attributed to the account, held or not.
    #[must_use]
    pub fn total_balance(&self) -> Amount {
        self.available_balance + self.withheld_balance
    }
}

/// Read-only balance snapshot returned by the ledger store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    pub available: Amount,
    pub withheld: Amount,
}

impl Balances {
    /// Available plus withheld.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.available + self.withheld
    }

    /// Zero in both buckets, the state of a freshly opened account.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            available: Decimal::ZERO,
            withheld: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_is_sum_of_buckets() {
        let balances = Balances {
            available: dec!(70),
            withheld: dec!(30),
        };
        assert_eq!(balances.total(), dec!(100));
        assert_eq!(Balances::zero().total(), dec!(0));
    }
}
