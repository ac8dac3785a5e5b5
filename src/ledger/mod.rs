//! The fulfillment core: ledger store, hold manager, slot booking,
//! order workflow, and the payment reconciliation adapter, all sharing
//! one storage pool.

pub mod accounts;
pub mod holds;
pub mod reconcile;
pub mod slots;
pub mod workflow;

use std::sync::Arc;

pub use accounts::{Ledger, TransactionRequest};
pub use holds::{AgentPortion, HoldAdjustment, HoldManager, PlaceHold};
pub use reconcile::{AppliedPayment, Reconciliation};
pub use slots::SlotBooking;
pub use workflow::OrderWorkflow;

use crate::config::Config;
use crate::db::{self, DbPool};
use crate::error::Result;

/// Entry point wiring the services over a shared pool.
pub struct Fulfillment {
    ledger: Ledger,
    holds: HoldManager,
    slots: SlotBooking,
    orders: OrderWorkflow,
    reconciliation: Reconciliation,
}

impl Fulfillment {
    /// Open (or create) the configured database, run migrations, and
    /// wire up the services.
    pub fn new(config: Config) -> Result<Self> {
        let pool = db::create_pool(&config.database)?;
        db::run_migrations(&pool)?;
        Ok(Self::with_pool(pool, config))
    }

    /// Wire the services over an existing pool. The caller is
    /// responsible for having run migrations.
    pub fn with_pool(pool: DbPool, config: Config) -> Self {
        let config = Arc::new(config);
        Self {
            ledger: Ledger::new(pool.clone()),
            holds: HoldManager::new(pool.clone()),
            slots: SlotBooking::new(pool.clone(), config.slots.clone()),
            orders: OrderWorkflow::new(pool.clone(), Arc::clone(&config)),
            reconciliation: Reconciliation::new(pool),
        }
    }

    /// Ledger store: accounts, balances, and the transaction log.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Hold manager: escrow lifecycle per order.
    pub fn holds(&self) -> &HoldManager {
        &self.holds
    }

    /// Slot booking: delivery window capacity.
    pub fn slots(&self) -> &SlotBooking {
        &self.slots
    }

    /// Order workflow: submission and status transitions.
    pub fn orders(&self) -> &OrderWorkflow {
        &self.orders
    }

    /// Reconciliation adapter for external payment callbacks.
    pub fn reconciliation(&self) -> &Reconciliation {
        &self.reconciliation
    }
}
