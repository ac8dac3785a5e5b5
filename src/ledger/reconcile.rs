//! Reconciliation adapter: translates external payment callbacks into
//! ledger transactions, idempotently.
//!
//! Providers deliver callbacks at least once; retries and duplicates
//! are routine. Every application is keyed by the provider's own
//! transaction reference, and a previously-seen reference returns the
//! original ledger transaction without writing anything.

use diesel::prelude::*;
use tracing::{debug, info};

use crate::db::{self, DbPool};
use crate::domain::{AccountId, Amount, LedgerTransaction, OrderId, TransactionType};
use crate::error::Result;

use super::accounts::{self, TransactionRequest};

/// Outcome of applying an external payment callback.
#[derive(Debug, Clone)]
pub struct AppliedPayment {
    pub transaction: LedgerTransaction,
    /// False when the reference had been applied before and this call
    /// changed nothing.
    pub newly_applied: bool,
}

/// Public reconciliation API over the connection pool.
pub struct Reconciliation {
    pool: DbPool,
}

impl Reconciliation {
    pub(crate) fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Apply an external payment to the ledger, deduplicating on the
    /// provider reference. Safe to call any number of times with the
    /// same reference.
    pub async fn apply_external_payment(
        &self,
        provider_reference: &str,
        account_id: AccountId,
        amount: Amount,
        transaction_type: TransactionType,
        order_id: Option<OrderId>,
    ) -> Result<AppliedPayment> {
        let provider_reference = provider_reference.to_string();
        db::write_tx(&self.pool, move |conn| {
            apply(
                conn,
                &provider_reference,
                account_id,
                amount,
                transaction_type,
                order_id,
            )
        })
        .await
    }
}

pub(crate) fn apply(
    conn: &mut SqliteConnection,
    provider_reference: &str,
    account_id: AccountId,
    amount: Amount,
    transaction_type: TransactionType,
    order_id: Option<OrderId>,
) -> Result<AppliedPayment> {
    if let Some(existing) = accounts::find_by_external_reference(conn, provider_reference)? {
        debug!(
            provider_reference,
            transaction_id = %existing.id,
            "external payment already applied, no-op"
        );
        return Ok(AppliedPayment {
            transaction: existing,
            newly_applied: false,
        });
    }

    let mut request = TransactionRequest::new(account_id, amount, transaction_type)
        .with_external_reference(provider_reference)
        .with_memo(format!("External payment {provider_reference}"));
    if let Some(order_id) = order_id {
        request = request.with_reference(order_id);
    }
    let transaction = accounts::record(conn, &request)?;

    info!(
        provider_reference,
        account_id = %account_id,
        amount = %amount,
        transaction_type = %transaction_type,
        "external payment applied"
    );
    Ok(AppliedPayment {
        transaction,
        newly_applied: true,
    })
}
