//! Builders for domain fixtures used across tests.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal_macros::dec;

use crate::config::Config;
use crate::domain::{
    Account, Actor, AgentTier, Amount, Currency, NewSlot, OrderDraft, SlotType, TransactionType,
    UserId,
};
use crate::ledger::{Fulfillment, TransactionRequest};

use super::db::memory_pool;

/// A fulfillment core over a fresh in-memory database with default
/// config.
pub fn core() -> Fulfillment {
    core_with_config(Config::default())
}

/// A fulfillment core over a fresh in-memory database with the given
/// config.
pub fn core_with_config(config: Config) -> Fulfillment {
    Fulfillment::with_pool(memory_pool(), config)
}

/// Open an XAF account for a new user and deposit `amount` into it.
pub async fn funded_account(core: &Fulfillment, amount: Amount) -> Account {
    let account = core
        .ledger()
        .open_account(UserId::new(), Currency::xaf())
        .await
        .expect("open account");
    if amount > rust_decimal::Decimal::ZERO {
        core.ledger()
            .record_transaction(
                TransactionRequest::new(account.id, amount, TransactionType::Deposit)
                    .with_memo("test funding"),
            )
            .await
            .expect("fund account");
    }
    account
}

/// Draft for a 100 + 10 delivery fee XAF order between the given
/// parties, with no tax and no per-km component.
pub fn order_draft(client_id: UserId, business_id: UserId) -> OrderDraft {
    OrderDraft {
        client_id,
        business_id,
        business_location_id: Default::default(),
        delivery_address_id: Default::default(),
        subtotal: dec!(100),
        base_delivery_fee: dec!(10),
        per_km_delivery_fee: dec!(0),
        tax_amount: dec!(0),
        total_amount: dec!(110),
        currency: Currency::xaf(),
        requested_window: None,
        special_instructions: None,
    }
}

/// A standard morning slot for Gabon with the given per-day capacity.
pub fn standard_slot(capacity: u32) -> NewSlot {
    NewSlot {
        country_code: "GA".to_string(),
        state: Some("Estuaire".to_string()),
        slot_name: "Morning".to_string(),
        slot_type: SlotType::Standard,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        max_orders_per_slot: capacity,
        display_order: 1,
    }
}

/// A delivery date far enough out that lead-time rules never interfere.
pub fn future_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 15).unwrap()
}

/// Client actor for the given user.
pub fn client(user_id: UserId) -> Actor {
    Actor::Client { user_id }
}

/// Business actor for the given user.
pub fn business(user_id: UserId) -> Actor {
    Actor::Business { user_id }
}

/// Unverified agent actor (100% collateral) for the given user.
pub fn agent(user_id: UserId) -> Actor {
    Actor::Agent {
        user_id,
        tier: AgentTier::Unverified,
    }
}

/// Agent actor with an explicit tier.
pub fn agent_with_tier(user_id: UserId, tier: AgentTier) -> Actor {
    Actor::Agent { user_id, tier }
}
