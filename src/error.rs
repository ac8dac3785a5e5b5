use thiserror::Error;

use crate::domain::pricing::PricingError;
use crate::domain::{
    AccountId, ActorRole, Amount, Currency, HoldId, OrderId, OrderStatus, SlotId, UserId, WindowId,
};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Ledger store errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("no active {currency} account for user {user_id}")]
    NoAccountForUser { user_id: UserId, currency: Currency },

    #[error("account {0} is deactivated")]
    AccountInactive(AccountId),

    #[error("user {user_id} already has a {currency} account")]
    DuplicateAccount { user_id: UserId, currency: Currency },

    #[error(
        "insufficient funds on account {account_id}: required {required}, available {available}"
    )]
    InsufficientFunds {
        account_id: AccountId,
        required: Amount,
        available: Amount,
    },

    #[error("transaction amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("adjustment amount must be non-zero")]
    ZeroAdjustment,

    #[error("currency mismatch: account is {account}, request is {requested}")]
    CurrencyMismatch { account: Currency, requested: Currency },
}

/// Hold manager errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HoldError {
    #[error("order {0} already has an active hold")]
    HoldExists(OrderId),

    #[error("hold {0} not found")]
    HoldNotFound(HoldId),

    #[error("no hold recorded for order {0}")]
    NoHoldForOrder(OrderId),

    #[error("hold amounts must be non-negative")]
    NegativeAmount,

    #[error("hold {0} is already resolved and cannot be amended")]
    HoldResolved(HoldId),

    #[error("hold {0} is staked by a different agent account")]
    AgentAccountMismatch(HoldId),
}

/// Slot booking errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {0} not found")]
    SlotNotFound(SlotId),

    #[error("slot {0} is inactive")]
    SlotInactive(SlotId),

    #[error("slot {slot_id} is fully booked for {date}")]
    SlotFull {
        slot_id: SlotId,
        date: chrono::NaiveDate,
    },

    #[error("delivery window {0} not found")]
    WindowNotFound(WindowId),

    #[error("order {0} already has a delivery window")]
    WindowExists(OrderId),

    #[error("window {0} was cancelled and cannot be confirmed")]
    WindowCancelled(WindowId),

    #[error("window {window_id} belongs to an order already {status}; cannot release")]
    WindowLocked {
        window_id: WindowId,
        status: OrderStatus,
    },
}

/// Order workflow errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{role} is not permitted to move an order from {from} to {to}")]
    ActorNotPermitted {
        role: ActorRole,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("only the assigned agent may act on order {0}")]
    NotAssignedAgent(OrderId),

    #[error("order {0} has no assigned agent")]
    NoAssignedAgent(OrderId),

    #[error("order total {total} does not match breakdown sum {breakdown}")]
    TotalMismatch { total: Amount, breakdown: Amount },

    #[error("order amounts must be non-negative")]
    NegativeAmount,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Hold(#[from] HoldError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Storage lock wait exceeded the busy timeout. Retry the whole
    /// logical operation; nothing was committed.
    #[error("storage contention, retry the operation: {0}")]
    Contention(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True for failures where the caller should retry the whole
    /// logical operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Contention(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_funds_message_names_the_account() {
        let id = AccountId::new();
        let err = LedgerError::InsufficientFunds {
            account_id: id,
            required: dec!(110),
            available: dec!(40),
        };
        let text = err.to_string();
        assert!(text.contains(&id.to_string()));
        assert!(text.contains("110"));
    }

    #[test]
    fn only_contention_is_retryable() {
        assert!(Error::Contention("database is locked".into()).is_retryable());
        assert!(!Error::Database("broken".into()).is_retryable());
    }
}
