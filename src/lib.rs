//! Waybill - Order fulfillment ledger for a multi-sided delivery
//! marketplace.
//!
//! This crate implements the money-and-state core behind clients who
//! order, businesses who fulfill, and agents who deliver:
//!
//! - **`ledger::accounts`** - Append-only transaction log per account
//!   with `available`/`withheld` running balances
//! - **`ledger::holds`** - Escrow holds tying an order to withheld
//!   client and agent funds, captured or released on resolution
//! - **`ledger::slots`** - Finite-capacity delivery-time-slot booking
//! - **`ledger::workflow`** - The multi-party order status machine and
//!   its ledger/slot side effects
//! - **`ledger::reconcile`** - Idempotent application of external
//!   payment callbacks
//!
//! Status transitions, hold placement, and slot reservation each run as
//! one atomic storage transaction: a failed side effect rolls the whole
//! operation back, so balances, holds, slot capacity, and order status
//! never drift apart.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Storage-agnostic types: accounts, orders, holds, slots
//! - [`domain::pricing`] - Delivery fee composition
//! - [`db`] - Diesel/SQLite persistence layer
//! - [`error`] - Error types for the crate
//! - [`ledger`] - The five core services and the [`Fulfillment`] facade
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use waybill::config::Config;
//! use waybill::domain::{Currency, UserId};
//! use waybill::Fulfillment;
//!
//! # async fn demo() -> waybill::Result<()> {
//! let core = Fulfillment::new(Config::default())?;
//! let account = core
//!     .ledger()
//!     .open_account(UserId::new(), Currency::xaf())
//!     .await?;
//! let balances = core.ledger().balances(account.id).await?;
//! assert_eq!(balances.total(), rust_decimal::Decimal::ZERO);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod logging;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Fulfillment;
