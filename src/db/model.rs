//! Database model types for Diesel ORM, with converters to and from the
//! domain layer.
//!
//! SQLite has no decimal column type, so every monetary value is stored
//! as TEXT and goes through `rust_decimal` here; timestamps are RFC3339
//! TEXT, dates and times ISO `%Y-%m-%d` / `%H:%M:%S`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    account_transactions, accounts, delivery_time_slots, delivery_time_windows, order_holds,
    order_status_history, orders,
};
use crate::domain::{
    Account, DeliveryTimeSlot, DeliveryTimeWindow, Geolocation, LedgerTransaction, Order,
    OrderHold, StatusHistoryEntry, WindowRequest,
};
use crate::error::{Error, Result};

pub(crate) fn parse_field<T>(value: &str, column: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Parse(format!("{column}: {e}")))
}

pub(crate) fn parse_decimal(value: &str, column: &'static str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Parse(format!("{column}: {e}")))
}

pub(crate) fn parse_datetime(value: &str, column: &'static str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("{column}: {e}")))
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| Error::Parse(format!("{column}: {e}")))
}

pub(crate) fn parse_time(value: &str, column: &'static str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|e| Error::Parse(format!("{column}: {e}")))
}

/// Database row for a balance account.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountRow {
    pub id: String,
    pub user_id: String,
    pub currency: String,
    pub available_balance: String,
    pub withheld_balance: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountRow {
    pub fn from_domain(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            user_id: account.user_id.to_string(),
            currency: account.currency.as_str().to_string(),
            available_balance: account.available_balance.to_string(),
            withheld_balance: account.withheld_balance.to_string(),
            is_active: account.is_active,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }

    pub fn to_domain(&self) -> Result<Account> {
        Ok(Account {
            id: parse_field(&self.id, "accounts.id")?,
            user_id: parse_field(&self.user_id, "accounts.user_id")?,
            currency: self.currency.as_str().into(),
            available_balance: parse_decimal(&self.available_balance, "accounts.available_balance")?,
            withheld_balance: parse_decimal(&self.withheld_balance, "accounts.withheld_balance")?,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at, "accounts.created_at")?,
            updated_at: parse_datetime(&self.updated_at, "accounts.updated_at")?,
        })
    }
}

/// Database row for a ledger transaction.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = account_transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub id: String,
    pub account_id: String,
    pub amount: String,
    pub transaction_type: String,
    pub reference_id: Option<String>,
    pub external_reference: Option<String>,
    pub memo: Option<String>,
    pub created_at: String,
}

impl TransactionRow {
    pub fn from_domain(tx: &LedgerTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            account_id: tx.account_id.to_string(),
            amount: tx.amount.to_string(),
            transaction_type: tx.transaction_type.as_str().to_string(),
            reference_id: tx.reference_id.map(|id| id.to_string()),
            external_reference: tx.external_reference.clone(),
            memo: tx.memo.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }

    pub fn to_domain(&self) -> Result<LedgerTransaction> {
        Ok(LedgerTransaction {
            id: parse_field(&self.id, "account_transactions.id")?,
            account_id: parse_field(&self.account_id, "account_transactions.account_id")?,
            amount: parse_decimal(&self.amount, "account_transactions.amount")?,
            transaction_type: parse_field(
                &self.transaction_type,
                "account_transactions.transaction_type",
            )?,
            reference_id: self
                .reference_id
                .as_deref()
                .map(|id| parse_field(id, "account_transactions.reference_id"))
                .transpose()?,
            external_reference: self.external_reference.clone(),
            memo: self.memo.clone(),
            created_at: parse_datetime(&self.created_at, "account_transactions.created_at")?,
        })
    }
}

/// Database row for an order.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: String,
    pub order_number: String,
    pub client_id: String,
    pub business_id: String,
    pub business_location_id: String,
    pub delivery_address_id: String,
    pub assigned_agent_id: Option<String>,
    pub subtotal: String,
    pub base_delivery_fee: String,
    pub per_km_delivery_fee: String,
    pub tax_amount: String,
    pub total_amount: String,
    pub currency: String,
    pub current_status: String,
    pub previous_status: Option<String>,
    pub requested_slot_id: Option<String>,
    pub requested_date: Option<String>,
    pub special_instructions: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderRow {
    pub fn from_domain(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number.clone(),
            client_id: order.client_id.to_string(),
            business_id: order.business_id.to_string(),
            business_location_id: order.business_location_id.to_string(),
            delivery_address_id: order.delivery_address_id.to_string(),
            assigned_agent_id: order.assigned_agent_id.map(|id| id.to_string()),
            subtotal: order.subtotal.to_string(),
            base_delivery_fee: order.base_delivery_fee.to_string(),
            per_km_delivery_fee: order.per_km_delivery_fee.to_string(),
            tax_amount: order.tax_amount.to_string(),
            total_amount: order.total_amount.to_string(),
            currency: order.currency.as_str().to_string(),
            current_status: order.current_status.as_str().to_string(),
            previous_status: order.previous_status.map(|s| s.as_str().to_string()),
            requested_slot_id: order
                .requested_window
                .as_ref()
                .map(|w| w.slot_id.to_string()),
            requested_date: order
                .requested_window
                .as_ref()
                .map(|w| w.preferred_date.format("%Y-%m-%d").to_string()),
            special_instructions: order.special_instructions.clone(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }

    pub fn to_domain(&self) -> Result<Order> {
        let requested_window = match (&self.requested_slot_id, &self.requested_date) {
            (Some(slot), Some(date)) => Some(WindowRequest {
                slot_id: parse_field(slot, "orders.requested_slot_id")?,
                preferred_date: parse_date(date, "orders.requested_date")?,
            }),
            _ => None,
        };

        Ok(Order {
            id: parse_field(&self.id, "orders.id")?,
            order_number: self.order_number.clone(),
            client_id: parse_field(&self.client_id, "orders.client_id")?,
            business_id: parse_field(&self.business_id, "orders.business_id")?,
            business_location_id: parse_field(
                &self.business_location_id,
                "orders.business_location_id",
            )?,
            delivery_address_id: parse_field(
                &self.delivery_address_id,
                "orders.delivery_address_id",
            )?,
            assigned_agent_id: self
                .assigned_agent_id
                .as_deref()
                .map(|id| parse_field(id, "orders.assigned_agent_id"))
                .transpose()?,
            subtotal: parse_decimal(&self.subtotal, "orders.subtotal")?,
            base_delivery_fee: parse_decimal(&self.base_delivery_fee, "orders.base_delivery_fee")?,
            per_km_delivery_fee: parse_decimal(
                &self.per_km_delivery_fee,
                "orders.per_km_delivery_fee",
            )?,
            tax_amount: parse_decimal(&self.tax_amount, "orders.tax_amount")?,
            total_amount: parse_decimal(&self.total_amount, "orders.total_amount")?,
            currency: self.currency.as_str().into(),
            current_status: parse_field(&self.current_status, "orders.current_status")?,
            previous_status: self
                .previous_status
                .as_deref()
                .map(|s| parse_field(s, "orders.previous_status"))
                .transpose()?,
            requested_window,
            special_instructions: self.special_instructions.clone(),
            created_at: parse_datetime(&self.created_at, "orders.created_at")?,
            updated_at: parse_datetime(&self.updated_at, "orders.updated_at")?,
        })
    }
}

/// Database row for a status history entry.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = order_status_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StatusHistoryRow {
    pub id: String,
    pub order_id: String,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_by_role: String,
    pub changed_by_user_id: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl StatusHistoryRow {
    pub fn from_domain(entry: &StatusHistoryEntry) -> Result<Self> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: entry.order_id.to_string(),
            previous_status: entry.previous_status.map(|s| s.as_str().to_string()),
            new_status: entry.new_status.as_str().to_string(),
            changed_by_role: entry.changed_by_role.as_str().to_string(),
            changed_by_user_id: entry.changed_by_user_id.map(|id| id.to_string()),
            location: entry
                .location
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            notes: entry.notes.clone(),
            created_at: entry.created_at.to_rfc3339(),
        })
    }

    pub fn to_domain(&self) -> Result<StatusHistoryEntry> {
        let location: Option<Geolocation> = self
            .location
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(StatusHistoryEntry {
            order_id: parse_field(&self.order_id, "order_status_history.order_id")?,
            previous_status: self
                .previous_status
                .as_deref()
                .map(|s| parse_field(s, "order_status_history.previous_status"))
                .transpose()?,
            new_status: parse_field(&self.new_status, "order_status_history.new_status")?,
            changed_by_role: parse_field(
                &self.changed_by_role,
                "order_status_history.changed_by_role",
            )?,
            changed_by_user_id: self
                .changed_by_user_id
                .as_deref()
                .map(|id| parse_field(id, "order_status_history.changed_by_user_id"))
                .transpose()?,
            location,
            notes: self.notes.clone(),
            created_at: parse_datetime(&self.created_at, "order_status_history.created_at")?,
        })
    }
}

/// Database row for an order hold.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = order_holds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HoldRow {
    pub id: String,
    pub order_id: String,
    pub client_account_id: String,
    pub agent_account_id: Option<String>,
    pub client_hold_amount: String,
    pub agent_hold_amount: String,
    pub delivery_fees: String,
    pub currency: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl HoldRow {
    pub fn from_domain(hold: &OrderHold) -> Self {
        Self {
            id: hold.id.to_string(),
            order_id: hold.order_id.to_string(),
            client_account_id: hold.client_account_id.to_string(),
            agent_account_id: hold.agent_account_id.map(|id| id.to_string()),
            client_hold_amount: hold.client_hold_amount.to_string(),
            agent_hold_amount: hold.agent_hold_amount.to_string(),
            delivery_fees: hold.delivery_fees.to_string(),
            currency: hold.currency.as_str().to_string(),
            status: hold.status.as_str().to_string(),
            created_at: hold.created_at.to_rfc3339(),
            updated_at: hold.updated_at.to_rfc3339(),
        }
    }

    pub fn to_domain(&self) -> Result<OrderHold> {
        Ok(OrderHold {
            id: parse_field(&self.id, "order_holds.id")?,
            order_id: parse_field(&self.order_id, "order_holds.order_id")?,
            client_account_id: parse_field(&self.client_account_id, "order_holds.client_account_id")?,
            agent_account_id: self
                .agent_account_id
                .as_deref()
                .map(|id| parse_field(id, "order_holds.agent_account_id"))
                .transpose()?,
            client_hold_amount: parse_decimal(
                &self.client_hold_amount,
                "order_holds.client_hold_amount",
            )?,
            agent_hold_amount: parse_decimal(
                &self.agent_hold_amount,
                "order_holds.agent_hold_amount",
            )?,
            delivery_fees: parse_decimal(&self.delivery_fees, "order_holds.delivery_fees")?,
            currency: self.currency.as_str().into(),
            status: parse_field(&self.status, "order_holds.status")?,
            created_at: parse_datetime(&self.created_at, "order_holds.created_at")?,
            updated_at: parse_datetime(&self.updated_at, "order_holds.updated_at")?,
        })
    }
}

/// Database row for a delivery time slot template.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = delivery_time_slots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SlotRow {
    pub id: String,
    pub country_code: String,
    pub state: Option<String>,
    pub slot_name: String,
    pub slot_type: String,
    pub start_time: String,
    pub end_time: String,
    pub max_orders_per_slot: i32,
    pub is_active: bool,
    pub display_order: i32,
}

impl SlotRow {
    pub fn from_domain(slot: &DeliveryTimeSlot) -> Self {
        Self {
            id: slot.id.to_string(),
            country_code: slot.country_code.clone(),
            state: slot.state.clone(),
            slot_name: slot.slot_name.clone(),
            slot_type: slot.slot_type.as_str().to_string(),
            start_time: slot.start_time.format("%H:%M:%S").to_string(),
            end_time: slot.end_time.format("%H:%M:%S").to_string(),
            max_orders_per_slot: slot.max_orders_per_slot as i32,
            is_active: slot.is_active,
            display_order: slot.display_order,
        }
    }

    pub fn to_domain(&self) -> Result<DeliveryTimeSlot> {
        Ok(DeliveryTimeSlot {
            id: parse_field(&self.id, "delivery_time_slots.id")?,
            country_code: self.country_code.clone(),
            state: self.state.clone(),
            slot_name: self.slot_name.clone(),
            slot_type: parse_field(&self.slot_type, "delivery_time_slots.slot_type")?,
            start_time: parse_time(&self.start_time, "delivery_time_slots.start_time")?,
            end_time: parse_time(&self.end_time, "delivery_time_slots.end_time")?,
            max_orders_per_slot: self.max_orders_per_slot.max(0) as u32,
            is_active: self.is_active,
            display_order: self.display_order,
        })
    }
}

/// Database row for a delivery time window.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = delivery_time_windows)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WindowRow {
    pub id: String,
    pub order_id: String,
    pub slot_id: String,
    pub preferred_date: String,
    pub time_slot_start: String,
    pub time_slot_end: String,
    pub is_confirmed: bool,
    pub is_cancelled: bool,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<String>,
    pub special_instructions: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl WindowRow {
    pub fn from_domain(window: &DeliveryTimeWindow) -> Self {
        Self {
            id: window.id.to_string(),
            order_id: window.order_id.to_string(),
            slot_id: window.slot_id.to_string(),
            preferred_date: window.preferred_date.format("%Y-%m-%d").to_string(),
            time_slot_start: window.time_slot_start.format("%H:%M:%S").to_string(),
            time_slot_end: window.time_slot_end.format("%H:%M:%S").to_string(),
            is_confirmed: window.is_confirmed,
            is_cancelled: window.is_cancelled,
            confirmed_by: window.confirmed_by.map(|id| id.to_string()),
            confirmed_at: window.confirmed_at.map(|at| at.to_rfc3339()),
            special_instructions: window.special_instructions.clone(),
            created_at: window.created_at.to_rfc3339(),
            updated_at: window.updated_at.to_rfc3339(),
        }
    }

    pub fn to_domain(&self) -> Result<DeliveryTimeWindow> {
        Ok(DeliveryTimeWindow {
            id: parse_field(&self.id, "delivery_time_windows.id")?,
            order_id: parse_field(&self.order_id, "delivery_time_windows.order_id")?,
            slot_id: parse_field(&self.slot_id, "delivery_time_windows.slot_id")?,
            preferred_date: parse_date(&self.preferred_date, "delivery_time_windows.preferred_date")?,
            time_slot_start: parse_time(
                &self.time_slot_start,
                "delivery_time_windows.time_slot_start",
            )?,
            time_slot_end: parse_time(&self.time_slot_end, "delivery_time_windows.time_slot_end")?,
            is_confirmed: self.is_confirmed,
            is_cancelled: self.is_cancelled,
            confirmed_by: self
                .confirmed_by
                .as_deref()
                .map(|id| parse_field(id, "delivery_time_windows.confirmed_by"))
                .transpose()?,
            confirmed_at: self
                .confirmed_at
                .as_deref()
                .map(|at| parse_datetime(at, "delivery_time_windows.confirmed_at"))
                .transpose()?,
            special_instructions: self.special_instructions.clone(),
            created_at: parse_datetime(&self.created_at, "delivery_time_windows.created_at")?,
            updated_at: parse_datetime(&self.updated_at, "delivery_time_windows.updated_at")?,
        })
    }
}
