//! Storage-agnostic domain types for the fulfillment core.

mod account;
mod hold;
mod ids;
mod money;
mod order;
mod slot;
mod transaction;

pub mod pricing;

// Identifiers
pub use ids::{
    AccountId, AddressId, HoldId, LocationId, OrderId, SlotId, TransactionId, UserId, WindowId,
};

// Money
pub use money::{Amount, Currency};

// Ledger
pub use account::{Account, Balances};
pub use transaction::{BalanceEffect, LedgerTransaction, TransactionType};

// Orders and workflow
pub use order::{
    transition_allowed, Actor, ActorRole, AgentTier, Geolocation, Order, OrderDraft,
    OrderNumberGenerator, OrderStatus, StatusHistoryEntry, WindowRequest,
};

// Holds
pub use hold::{HoldOutcome, HoldStatus, OrderHold};

// Slot booking
pub use slot::{
    AvailableSlot, DeliveryTimeSlot, DeliveryTimeWindow, NewSlot, SlotCapacity, SlotType,
};
