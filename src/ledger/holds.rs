//! Hold manager: escrow lifecycle for orders.
//!
//! One hold record per order coordinates the client's held total and
//! the agent's collateral. Every movement goes through the ledger store
//! inside the caller's storage transaction, so a failure anywhere rolls
//! back the whole placement — holds are all-or-nothing.

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::db::model::HoldRow;
use crate::db::schema::order_holds;
use crate::db::{self, DbPool};
use crate::domain::{
    AccountId, Amount, Currency, HoldId, HoldOutcome, HoldStatus, OrderHold, OrderId,
    TransactionType,
};
use crate::error::{Error, HoldError, LedgerError, Result};

use super::accounts::{self, TransactionRequest};

/// Agent side of a hold: the account staked and the collateral amount.
#[derive(Debug, Clone, Copy)]
pub struct AgentPortion {
    pub account_id: AccountId,
    pub amount: Amount,
}

/// Input for placing a hold on an order.
#[derive(Debug, Clone)]
pub struct PlaceHold {
    pub order_id: OrderId,
    pub client_account_id: AccountId,
    pub client_amount: Amount,
    pub agent: Option<AgentPortion>,
    pub delivery_fees: Amount,
    pub currency: Currency,
}

/// Delta-based amendment of an active hold. `None` leaves a side
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldAdjustment {
    pub client_amount: Option<Amount>,
    pub agent: Option<AgentPortion>,
}

/// Public hold API over the connection pool.
pub struct HoldManager {
    pool: DbPool,
}

impl HoldManager {
    pub(crate) fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Place a hold for an order, withholding the client amount and the
    /// agent collateral (when an agent is already assigned) atomically.
    pub async fn place_hold(&self, request: PlaceHold) -> Result<OrderHold> {
        db::write_tx(&self.pool, move |conn| place(conn, &request)).await
    }

    /// Amend an active hold by issuing incremental hold/release
    /// transactions for the difference on each side.
    pub async fn update_hold(
        &self,
        hold_id: HoldId,
        adjustment: HoldAdjustment,
    ) -> Result<OrderHold> {
        db::write_tx(&self.pool, move |conn| adjust(conn, hold_id, &adjustment)).await
    }

    /// Resolve an active hold. Resolving an already-resolved hold is a
    /// no-op returning the hold unchanged, so retried callbacks are
    /// harmless.
    pub async fn resolve_hold(&self, hold_id: HoldId, outcome: HoldOutcome) -> Result<OrderHold> {
        db::write_tx(&self.pool, move |conn| {
            let hold = load(conn, hold_id)?;
            resolve(conn, hold, outcome)
        })
        .await
    }

    /// Look up the hold recorded for an order, if any.
    pub async fn hold_for_order(&self, order_id: OrderId) -> Result<Option<OrderHold>> {
        db::read_only(&self.pool, move |conn| find_for_order(conn, order_id)).await
    }
}

pub(crate) fn load(conn: &mut SqliteConnection, hold_id: HoldId) -> Result<OrderHold> {
    let row: Option<HoldRow> = order_holds::table
        .find(hold_id.to_string())
        .first(conn)
        .optional()?;
    row.ok_or_else(|| HoldError::HoldNotFound(hold_id).into())
        .and_then(|row| row.to_domain())
}

/// Latest hold for the order: the active one if present, otherwise the
/// most recently resolved.
pub(crate) fn find_for_order(
    conn: &mut SqliteConnection,
    order_id: OrderId,
) -> Result<Option<OrderHold>> {
    let rows: Vec<HoldRow> = order_holds::table
        .filter(order_holds::order_id.eq(order_id.to_string()))
        .order(order_holds::created_at.desc())
        .load(conn)?;
    let mut holds = rows
        .iter()
        .map(HoldRow::to_domain)
        .collect::<Result<Vec<_>>>()?;
    if let Some(pos) = holds.iter().position(|h| h.status == HoldStatus::Active) {
        return Ok(Some(holds.swap_remove(pos)));
    }
    Ok(holds.into_iter().next())
}

pub(crate) fn place(conn: &mut SqliteConnection, request: &PlaceHold) -> Result<OrderHold> {
    if request.client_amount < Decimal::ZERO
        || request.delivery_fees < Decimal::ZERO
        || request.agent.is_some_and(|a| a.amount < Decimal::ZERO)
    {
        return Err(HoldError::NegativeAmount.into());
    }

    let existing: Vec<HoldRow> = order_holds::table
        .filter(order_holds::order_id.eq(request.order_id.to_string()))
        .filter(order_holds::status.eq(HoldStatus::Active.as_str()))
        .load(conn)?;
    if !existing.is_empty() {
        return Err(HoldError::HoldExists(request.order_id).into());
    }

    let client_account = accounts::load_account(conn, request.client_account_id)?;
    if client_account.currency != request.currency {
        return Err(Error::from(LedgerError::CurrencyMismatch {
            account: client_account.currency,
            requested: request.currency.clone(),
        }));
    }

    if request.client_amount > Decimal::ZERO {
        accounts::record(
            conn,
            &TransactionRequest::new(
                request.client_account_id,
                request.client_amount,
                TransactionType::Hold,
            )
            .with_reference(request.order_id)
            .with_memo(format!("Hold for order {}", request.order_id)),
        )?;
    }
    if let Some(agent) = request.agent {
        if agent.amount > Decimal::ZERO {
            accounts::record(
                conn,
                &TransactionRequest::new(agent.account_id, agent.amount, TransactionType::Hold)
                    .with_reference(request.order_id)
                    .with_memo(format!("Agent hold for order {}", request.order_id)),
            )?;
        }
    }

    let now = Utc::now();
    let hold = OrderHold {
        id: HoldId::new(),
        order_id: request.order_id,
        client_account_id: request.client_account_id,
        agent_account_id: request.agent.map(|a| a.account_id),
        client_hold_amount: request.client_amount,
        agent_hold_amount: request.agent.map_or(Decimal::ZERO, |a| a.amount),
        delivery_fees: request.delivery_fees,
        currency: request.currency.clone(),
        status: HoldStatus::Active,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(order_holds::table)
        .values(HoldRow::from_domain(&hold))
        .execute(conn)?;

    info!(
        order_id = %hold.order_id,
        client_amount = %hold.client_hold_amount,
        agent_amount = %hold.agent_hold_amount,
        "hold placed"
    );
    Ok(hold)
}

pub(crate) fn adjust(
    conn: &mut SqliteConnection,
    hold_id: HoldId,
    adjustment: &HoldAdjustment,
) -> Result<OrderHold> {
    let mut hold = load(conn, hold_id)?;
    if hold.status.is_resolved() {
        return Err(HoldError::HoldResolved(hold_id).into());
    }

    if let Some(new_client_amount) = adjustment.client_amount {
        if new_client_amount < Decimal::ZERO {
            return Err(HoldError::NegativeAmount.into());
        }
        apply_delta(
            conn,
            hold.client_account_id,
            hold.client_hold_amount,
            new_client_amount,
            hold.order_id,
        )?;
        hold.client_hold_amount = new_client_amount;
    }

    if let Some(agent) = adjustment.agent {
        if agent.amount < Decimal::ZERO {
            return Err(HoldError::NegativeAmount.into());
        }
        match hold.agent_account_id {
            Some(existing) if existing != agent.account_id => {
                return Err(HoldError::AgentAccountMismatch(hold_id).into());
            }
            _ => {}
        }
        apply_delta(
            conn,
            agent.account_id,
            hold.agent_hold_amount,
            agent.amount,
            hold.order_id,
        )?;
        hold.agent_account_id = Some(agent.account_id);
        hold.agent_hold_amount = agent.amount;
    }

    hold.updated_at = Utc::now();
    diesel::update(order_holds::table.find(hold_id.to_string()))
        .set((
            order_holds::client_hold_amount.eq(hold.client_hold_amount.to_string()),
            order_holds::agent_account_id.eq(hold.agent_account_id.map(|id| id.to_string())),
            order_holds::agent_hold_amount.eq(hold.agent_hold_amount.to_string()),
            order_holds::updated_at.eq(hold.updated_at.to_rfc3339()),
        ))
        .execute(conn)?;

    info!(
        hold_id = %hold_id,
        client_amount = %hold.client_hold_amount,
        agent_amount = %hold.agent_hold_amount,
        "hold amended"
    );
    Ok(hold)
}

/// Issue the incremental transaction that moves a held side from
/// `current` to `target`; increases hold more, decreases release the
/// difference. Never reconstructs the full amount, so repeated
/// adjustments cannot double-count.
fn apply_delta(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    current: Amount,
    target: Amount,
    order_id: OrderId,
) -> Result<()> {
    let delta = target - current;
    if delta > Decimal::ZERO {
        accounts::record(
            conn,
            &TransactionRequest::new(account_id, delta, TransactionType::Hold)
                .with_reference(order_id)
                .with_memo(format!("Hold increased for order {order_id}")),
        )?;
    } else if delta < Decimal::ZERO {
        accounts::record(
            conn,
            &TransactionRequest::new(account_id, -delta, TransactionType::Release)
                .with_reference(order_id)
                .with_memo(format!("Hold decreased for order {order_id}")),
        )?;
    }
    Ok(())
}

pub(crate) fn resolve(
    conn: &mut SqliteConnection,
    hold: OrderHold,
    outcome: HoldOutcome,
) -> Result<OrderHold> {
    if hold.status.is_resolved() {
        debug!(hold_id = %hold.id, status = %hold.status, "hold already resolved, no-op");
        return Ok(hold);
    }

    let mut hold = hold;
    match outcome {
        HoldOutcome::Capture => {
            // The client's held total becomes payment; the agent gets
            // their collateral back. Expressed as release+payment pairs
            // so the log replays cleanly.
            if hold.client_hold_amount > Decimal::ZERO {
                accounts::record(
                    conn,
                    &TransactionRequest::new(
                        hold.client_account_id,
                        hold.client_hold_amount,
                        TransactionType::Release,
                    )
                    .with_reference(hold.order_id)
                    .with_memo("Hold released for delivery".to_string()),
                )?;
                accounts::record(
                    conn,
                    &TransactionRequest::new(
                        hold.client_account_id,
                        hold.client_hold_amount,
                        TransactionType::Payment,
                    )
                    .with_reference(hold.order_id)
                    .with_memo(format!("Payment for delivered order {}", hold.order_id)),
                )?;
            }
            if let (Some(agent_account), true) = (
                hold.agent_account_id,
                hold.agent_hold_amount > Decimal::ZERO,
            ) {
                accounts::record(
                    conn,
                    &TransactionRequest::new(
                        agent_account,
                        hold.agent_hold_amount,
                        TransactionType::Release,
                    )
                    .with_reference(hold.order_id)
                    .with_memo(format!(
                        "Collateral returned for delivered order {}",
                        hold.order_id
                    )),
                )?;
            }
        }
        HoldOutcome::Release => {
            if hold.client_hold_amount > Decimal::ZERO {
                accounts::record(
                    conn,
                    &TransactionRequest::new(
                        hold.client_account_id,
                        hold.client_hold_amount,
                        TransactionType::Release,
                    )
                    .with_reference(hold.order_id)
                    .with_memo(format!("Hold released for order {}", hold.order_id)),
                )?;
            }
            if let (Some(agent_account), true) = (
                hold.agent_account_id,
                hold.agent_hold_amount > Decimal::ZERO,
            ) {
                accounts::record(
                    conn,
                    &TransactionRequest::new(
                        agent_account,
                        hold.agent_hold_amount,
                        TransactionType::Release,
                    )
                    .with_reference(hold.order_id)
                    .with_memo(format!("Agent hold released for order {}", hold.order_id)),
                )?;
            }
        }
    }

    hold.status = outcome.terminal_status();
    hold.updated_at = Utc::now();
    diesel::update(order_holds::table.find(hold.id.to_string()))
        .set((
            order_holds::status.eq(hold.status.as_str()),
            order_holds::updated_at.eq(hold.updated_at.to_rfc3339()),
        ))
        .execute(conn)?;

    info!(hold_id = %hold.id, order_id = %hold.order_id, status = %hold.status, "hold resolved");
    Ok(hold)
}
