//! Order state machine: transition validation, status history, and the
//! ledger/slot side effects each status entry triggers.
//!
//! Every transition runs in one immediate storage transaction together
//! with its side effects. If reserving the slot or moving money fails,
//! the status write rolls back with it and the order is unchanged —
//! `current_status` never diverges from what the ledger and the slot
//! book imply.

use std::sync::Arc;

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::Config;
use crate::db::model::{OrderRow, StatusHistoryRow};
use crate::db::schema::{order_status_history, orders};
use crate::db::{self, DbPool};
use crate::domain::{
    transition_allowed, Actor, ActorRole, Geolocation, Order, OrderDraft, OrderHold, OrderId,
    OrderNumberGenerator, OrderStatus, StatusHistoryEntry, TransactionType, UserId,
};
use crate::error::{Error, HoldError, OrderError, Result};

use super::accounts::{self, TransactionRequest};
use super::holds::{self, AgentPortion, HoldAdjustment, PlaceHold};
use super::slots;

/// Public order workflow API over the connection pool.
pub struct OrderWorkflow {
    pool: DbPool,
    config: Arc<Config>,
    order_numbers: OrderNumberGenerator,
}

impl OrderWorkflow {
    pub(crate) fn new(pool: DbPool, config: Arc<Config>) -> Self {
        Self {
            pool,
            config,
            order_numbers: OrderNumberGenerator::new(),
        }
    }

    /// Submit a client order. Line totals arrive pre-validated from the
    /// catalog layer; the core checks only that the monetary breakdown
    /// sums to the total within the currency's rounding tolerance. The
    /// requested delivery window, if any, is recorded but not reserved —
    /// capacity is consumed when the business confirms.
    pub async fn submit_order(&self, draft: OrderDraft) -> Result<Order> {
        for amount in [
            draft.subtotal,
            draft.base_delivery_fee,
            draft.per_km_delivery_fee,
            draft.tax_amount,
            draft.total_amount,
        ] {
            if amount < Decimal::ZERO {
                return Err(OrderError::NegativeAmount.into());
            }
        }
        let breakdown = draft.breakdown_sum();
        if (breakdown - draft.total_amount).abs() > draft.currency.tolerance() {
            return Err(OrderError::TotalMismatch {
                total: draft.total_amount,
                breakdown,
            }
            .into());
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            order_number: self.order_numbers.next_number(),
            client_id: draft.client_id,
            business_id: draft.business_id,
            business_location_id: draft.business_location_id,
            delivery_address_id: draft.delivery_address_id,
            assigned_agent_id: None,
            subtotal: draft.subtotal,
            base_delivery_fee: draft.base_delivery_fee,
            per_km_delivery_fee: draft.per_km_delivery_fee,
            tax_amount: draft.tax_amount,
            total_amount: draft.total_amount,
            currency: draft.currency,
            current_status: OrderStatus::Pending,
            previous_status: None,
            requested_window: draft.requested_window,
            special_instructions: draft.special_instructions,
            created_at: now,
            updated_at: now,
        };

        let order = db::write_tx(&self.pool, move |conn| {
            diesel::insert_into(orders::table)
                .values(OrderRow::from_domain(&order))
                .execute(conn)?;
            insert_history(
                conn,
                &StatusHistoryEntry {
                    order_id: order.id,
                    previous_status: None,
                    new_status: OrderStatus::Pending,
                    changed_by_role: ActorRole::Client,
                    changed_by_user_id: Some(order.client_id),
                    location: None,
                    notes: Some("Order submitted".to_string()),
                    created_at: now,
                },
            )?;
            Ok(order)
        })
        .await?;

        info!(order_id = %order.id, order_number = %order.order_number, "order submitted");
        Ok(order)
    }

    /// Move an order to `target`, firing the status's side effects in
    /// the same storage transaction.
    pub async fn transition(
        &self,
        order_id: OrderId,
        target: OrderStatus,
        actor: Actor,
        notes: Option<String>,
        location: Option<Geolocation>,
    ) -> Result<Order> {
        let config = Arc::clone(&self.config);
        db::write_tx(&self.pool, move |conn| {
            apply_transition(conn, &config, order_id, target, &actor, notes, location)
        })
        .await
    }

    /// Fetch an order by id.
    pub async fn order(&self, order_id: OrderId) -> Result<Order> {
        db::read_only(&self.pool, move |conn| load_order(conn, order_id)).await
    }

    /// Full status audit trail, oldest first.
    pub async fn history(&self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>> {
        db::read_only(&self.pool, move |conn| {
            let rows: Vec<StatusHistoryRow> = order_status_history::table
                .filter(order_status_history::order_id.eq(order_id.to_string()))
                .order(order_status_history::created_at.asc())
                .load(conn)?;
            rows.iter().map(StatusHistoryRow::to_domain).collect()
        })
        .await
    }
}

pub(crate) fn load_order(conn: &mut SqliteConnection, order_id: OrderId) -> Result<Order> {
    let row: Option<OrderRow> = orders::table
        .find(order_id.to_string())
        .first(conn)
        .optional()?;
    row.ok_or_else(|| OrderError::OrderNotFound(order_id).into())
        .and_then(|row| row.to_domain())
}

fn insert_history(conn: &mut SqliteConnection, entry: &StatusHistoryEntry) -> Result<()> {
    diesel::insert_into(order_status_history::table)
        .values(StatusHistoryRow::from_domain(entry)?)
        .execute(conn)?;
    Ok(())
}

fn validate_edge(order: &Order, target: OrderStatus, actor: &Actor) -> Result<()> {
    let from = order.current_status;
    if !transition_allowed(from, target, actor.role()) {
        // Distinguish "nobody may take this edge" from "not you".
        let edge_exists = transition_allowed(from, target, ActorRole::System);
        if edge_exists {
            return Err(OrderError::ActorNotPermitted {
                role: actor.role(),
                from,
                to: target,
            }
            .into());
        }
        return Err(OrderError::InvalidTransition { from, to: target }.into());
    }

    // Past assignment, delivery-leg moves are reserved for the agent
    // actually carrying the order.
    let needs_assigned_agent = matches!(
        target,
        OrderStatus::PickedUp
            | OrderStatus::InTransit
            | OrderStatus::OutForDelivery
            | OrderStatus::Delivered
            | OrderStatus::Failed
    ) && from != OrderStatus::Pending;
    if needs_assigned_agent {
        if let Actor::Agent { user_id, .. } = actor {
            match order.assigned_agent_id {
                Some(assigned) if assigned == *user_id => {}
                Some(_) => return Err(OrderError::NotAssignedAgent(order.id).into()),
                None => return Err(OrderError::NoAssignedAgent(order.id).into()),
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_transition(
    conn: &mut SqliteConnection,
    config: &Config,
    order_id: OrderId,
    target: OrderStatus,
    actor: &Actor,
    notes: Option<String>,
    location: Option<Geolocation>,
) -> Result<Order> {
    let mut order = load_order(conn, order_id)?;
    validate_edge(&order, target, actor)?;

    match target {
        OrderStatus::Confirmed => {
            if let Some(window) = &order.requested_window {
                slots::reserve(
                    conn,
                    window.slot_id,
                    window.preferred_date,
                    order.id,
                    order.special_instructions.clone(),
                )?;
            }
            let client_account =
                accounts::load_account_for_user(conn, order.client_id, &order.currency)?;
            holds::place(
                conn,
                &PlaceHold {
                    order_id: order.id,
                    client_account_id: client_account.id,
                    client_amount: order.total_amount,
                    agent: None,
                    delivery_fees: order.delivery_fees(),
                    currency: order.currency.clone(),
                },
            )?;
        }
        OrderStatus::AssignedToAgent => {
            let Actor::Agent { user_id, tier } = actor else {
                return Err(OrderError::ActorNotPermitted {
                    role: actor.role(),
                    from: order.current_status,
                    to: target,
                }
                .into());
            };
            let agent_account = accounts::load_account_for_user(conn, *user_id, &order.currency)?;
            let hold = active_hold(conn, order.id)?;
            let percentage = config.holds.percentage_for(*tier);
            let collateral = order
                .currency
                .round(hold.delivery_fees * percentage / Decimal::ONE_HUNDRED);
            holds::adjust(
                conn,
                hold.id,
                &HoldAdjustment {
                    client_amount: None,
                    agent: Some(AgentPortion {
                        account_id: agent_account.id,
                        amount: collateral,
                    }),
                },
            )?;
            order.assigned_agent_id = Some(*user_id);
        }
        OrderStatus::Delivered => {
            let hold = active_hold(conn, order.id)?;
            let hold = holds::resolve(conn, hold, crate::domain::HoldOutcome::Capture)?;
            pay_out(conn, &order, &hold)?;
        }
        OrderStatus::Cancelled | OrderStatus::Failed => {
            if let Some(hold) = holds::find_for_order(conn, order.id)? {
                if !hold.status.is_resolved() {
                    holds::resolve(conn, hold, crate::domain::HoldOutcome::Release)?;
                }
            }
            if let Some(window) = slots::find_for_order(conn, order.id)? {
                slots::release(conn, window.id)?;
            }
        }
        _ => {}
    }

    let now = Utc::now();
    insert_history(
        conn,
        &StatusHistoryEntry {
            order_id: order.id,
            previous_status: Some(order.current_status),
            new_status: target,
            changed_by_role: actor.role(),
            changed_by_user_id: actor.user_id(),
            location,
            notes,
            created_at: now,
        },
    )?;

    order.previous_status = Some(order.current_status);
    order.current_status = target;
    order.updated_at = now;
    diesel::update(orders::table.find(order.id.to_string()))
        .set((
            orders::current_status.eq(order.current_status.as_str()),
            orders::previous_status.eq(order.previous_status.map(|s| s.as_str())),
            orders::assigned_agent_id.eq(order.assigned_agent_id.map(|id| id.to_string())),
            orders::updated_at.eq(order.updated_at.to_rfc3339()),
        ))
        .execute(conn)?;

    info!(
        order_id = %order.id,
        from = %order.previous_status.map(|s| s.as_str()).unwrap_or("-"),
        to = %order.current_status,
        role = %actor.role(),
        "order transitioned"
    );
    Ok(order)
}

fn active_hold(conn: &mut SqliteConnection, order_id: OrderId) -> Result<OrderHold> {
    match holds::find_for_order(conn, order_id)? {
        Some(hold) if !hold.status.is_resolved() => Ok(hold),
        _ => Err(HoldError::NoHoldForOrder(order_id).into()),
    }
}

/// Credit the business and the agent after a captured delivery: the
/// business receives the order total minus delivery fees, the agent
/// receives the delivery fees.
fn pay_out(conn: &mut SqliteConnection, order: &Order, hold: &OrderHold) -> Result<()> {
    let business_share = order.total_amount - hold.delivery_fees;
    if business_share > Decimal::ZERO {
        let business_account =
            accounts::load_account_for_user(conn, order.business_id, &order.currency)?;
        accounts::record(
            conn,
            &TransactionRequest::new(business_account.id, business_share, TransactionType::Deposit)
                .with_reference(order.id)
                .with_memo(format!("Payment for delivered order {}", order.order_number)),
        )?;
    }
    if hold.delivery_fees > Decimal::ZERO {
        let agent_user: UserId = order
            .assigned_agent_id
            .ok_or_else(|| Error::from(OrderError::NoAssignedAgent(order.id)))?;
        let agent_account = accounts::load_account_for_user(conn, agent_user, &order.currency)?;
        accounts::record(
            conn,
            &TransactionRequest::new(
                agent_account.id,
                hold.delivery_fees,
                TransactionType::Deposit,
            )
            .with_reference(order.id)
            .with_memo(format!("Delivery fees for order {}", order.order_number)),
        )?;
    }
    Ok(())
}
