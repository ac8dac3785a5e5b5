//! Ledger store: append-only transaction log plus running balances.
//!
//! The only writer of account balances in the crate. Every mutation
//! appends a transaction row and adjusts the balances in the same
//! storage transaction, so the log and the balances cannot drift apart.

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use tracing::info;

use crate::db::model::{AccountRow, TransactionRow};
use crate::db::schema::{account_transactions, accounts};
use crate::db::{self, DbPool};
use crate::domain::{
    Account, AccountId, Amount, Balances, Currency, LedgerTransaction, OrderId, TransactionId,
    TransactionType, UserId,
};
use crate::error::{Error, LedgerError, Result};

/// Input for recording one ledger transaction.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub account_id: AccountId,
    pub amount: Amount,
    pub transaction_type: TransactionType,
    pub reference_id: Option<OrderId>,
    pub external_reference: Option<String>,
    pub memo: Option<String>,
}

impl TransactionRequest {
    /// Request with no reference or memo attached.
    #[must_use]
    pub fn new(account_id: AccountId, amount: Amount, transaction_type: TransactionType) -> Self {
        Self {
            account_id,
            amount,
            transaction_type,
            reference_id: None,
            external_reference: None,
            memo: None,
        }
    }

    /// Attach the order that caused this movement.
    #[must_use]
    pub fn with_reference(mut self, order_id: OrderId) -> Self {
        self.reference_id = Some(order_id);
        self
    }

    /// Attach a payment-provider transaction id for dedup.
    #[must_use]
    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// Attach a human-readable memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Public ledger API over the connection pool.
pub struct Ledger {
    pool: DbPool,
}

impl Ledger {
    pub(crate) fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open a balance account for a user in a currency. Each user gets
    /// at most one account per currency.
    pub async fn open_account(&self, user_id: UserId, currency: Currency) -> Result<Account> {
        db::write_tx(&self.pool, move |conn| {
            let existing: Option<AccountRow> = accounts::table
                .filter(accounts::user_id.eq(user_id.to_string()))
                .filter(accounts::currency.eq(currency.as_str()))
                .first(conn)
                .optional()?;
            if existing.is_some() {
                return Err(LedgerError::DuplicateAccount { user_id, currency }.into());
            }

            let now = Utc::now();
            let account = Account {
                id: AccountId::new(),
                user_id,
                currency,
                available_balance: Decimal::ZERO,
                withheld_balance: Decimal::ZERO,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            diesel::insert_into(accounts::table)
                .values(AccountRow::from_domain(&account))
                .execute(conn)?;

            info!(account_id = %account.id, user_id = %account.user_id, currency = %account.currency, "account opened");
            Ok(account)
        })
        .await
    }

    /// Deactivate an account. Idempotent; the account keeps its
    /// balances and history but rejects further transactions.
    pub async fn deactivate_account(&self, account_id: AccountId) -> Result<Account> {
        db::write_tx(&self.pool, move |conn| {
            let mut account = load_account(conn, account_id)?;
            if account.is_active {
                account.is_active = false;
                account.updated_at = Utc::now();
                diesel::update(accounts::table.find(account_id.to_string()))
                    .set((
                        accounts::is_active.eq(false),
                        accounts::updated_at.eq(account.updated_at.to_rfc3339()),
                    ))
                    .execute(conn)?;
                info!(account_id = %account_id, "account deactivated");
            }
            Ok(account)
        })
        .await
    }

    /// Record a transaction and update the account's balances
    /// atomically.
    pub async fn record_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<LedgerTransaction> {
        db::write_tx(&self.pool, move |conn| record(conn, &request)).await
    }

    /// Current balances; read-only.
    pub async fn balances(&self, account_id: AccountId) -> Result<Balances> {
        let account = self.account(account_id).await?;
        Ok(Balances {
            available: account.available_balance,
            withheld: account.withheld_balance,
        })
    }

    /// Fetch an account by id.
    pub async fn account(&self, account_id: AccountId) -> Result<Account> {
        db::read_only(&self.pool, move |conn| load_account(conn, account_id)).await
    }

    /// Fetch a user's active account in a currency.
    pub async fn account_for_user(&self, user_id: UserId, currency: Currency) -> Result<Account> {
        db::read_only(&self.pool, move |conn| {
            load_account_for_user(conn, user_id, &currency)
        })
        .await
    }

    /// Newest-first slice of the account's transaction log.
    pub async fn transactions(
        &self,
        account_id: AccountId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>> {
        db::read_only(&self.pool, move |conn| {
            let rows: Vec<TransactionRow> = account_transactions::table
                .filter(account_transactions::account_id.eq(account_id.to_string()))
                .order(account_transactions::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;
            rows.iter().map(TransactionRow::to_domain).collect()
        })
        .await
    }
}

/// Load an account row inside an open transaction.
pub(crate) fn load_account(conn: &mut SqliteConnection, account_id: AccountId) -> Result<Account> {
    let row: Option<AccountRow> = accounts::table
        .find(account_id.to_string())
        .first(conn)
        .optional()?;
    row.ok_or_else(|| LedgerError::AccountNotFound(account_id).into())
        .and_then(|row| row.to_domain())
}

/// Load a user's active account for a currency inside an open
/// transaction.
pub(crate) fn load_account_for_user(
    conn: &mut SqliteConnection,
    user_id: UserId,
    currency: &Currency,
) -> Result<Account> {
    let row: Option<AccountRow> = accounts::table
        .filter(accounts::user_id.eq(user_id.to_string()))
        .filter(accounts::currency.eq(currency.as_str()))
        .filter(accounts::is_active.eq(true))
        .first(conn)
        .optional()?;
    row.ok_or_else(|| {
        Error::from(LedgerError::NoAccountForUser {
            user_id,
            currency: currency.clone(),
        })
    })
    .and_then(|row| row.to_domain())
}

/// Record a transaction inside an open transaction: validates the
/// request, appends the log row, and writes the new balances.
pub(crate) fn record(
    conn: &mut SqliteConnection,
    request: &TransactionRequest,
) -> Result<LedgerTransaction> {
    match request.transaction_type {
        TransactionType::Adjustment => {
            if request.amount.is_zero() {
                return Err(LedgerError::ZeroAdjustment.into());
            }
        }
        _ => {
            if request.amount <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount(request.amount).into());
            }
        }
    }

    let account = load_account(conn, request.account_id)?;
    if !account.is_active {
        return Err(LedgerError::AccountInactive(account.id).into());
    }

    let effect = request.transaction_type.effect(request.amount);
    if effect.available < Decimal::ZERO && account.available_balance < -effect.available {
        return Err(LedgerError::InsufficientFunds {
            account_id: account.id,
            required: -effect.available,
            available: account.available_balance,
        }
        .into());
    }
    if effect.withheld < Decimal::ZERO && account.withheld_balance < -effect.withheld {
        return Err(LedgerError::InsufficientFunds {
            account_id: account.id,
            required: -effect.withheld,
            available: account.withheld_balance,
        }
        .into());
    }

    let transaction = LedgerTransaction {
        id: TransactionId::new(),
        account_id: account.id,
        amount: request.amount,
        transaction_type: request.transaction_type,
        reference_id: request.reference_id,
        external_reference: request.external_reference.clone(),
        memo: request.memo.clone(),
        created_at: Utc::now(),
    };
    diesel::insert_into(account_transactions::table)
        .values(TransactionRow::from_domain(&transaction))
        .execute(conn)?;

    let new_available = account.available_balance + effect.available;
    let new_withheld = account.withheld_balance + effect.withheld;
    diesel::update(accounts::table.find(account.id.to_string()))
        .set((
            accounts::available_balance.eq(new_available.to_string()),
            accounts::withheld_balance.eq(new_withheld.to_string()),
            accounts::updated_at.eq(transaction.created_at.to_rfc3339()),
        ))
        .execute(conn)?;

    info!(
        account_id = %account.id,
        transaction_type = %transaction.transaction_type,
        amount = %transaction.amount,
        available = %new_available,
        withheld = %new_withheld,
        "transaction recorded"
    );
    Ok(transaction)
}

/// Find a transaction by its payment-provider reference.
pub(crate) fn find_by_external_reference(
    conn: &mut SqliteConnection,
    reference: &str,
) -> Result<Option<LedgerTransaction>> {
    let row: Option<TransactionRow> = account_transactions::table
        .filter(account_transactions::external_reference.eq(reference))
        .first(conn)
        .optional()?;
    row.map(|row| row.to_domain()).transpose()
}
