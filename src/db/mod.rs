//! Database layer for persistence using Diesel ORM.
//!
//! All multi-step mutations in this crate run inside a single SQLite
//! *immediate* transaction, which takes the write lock up front and so
//! serializes writers — the storage-level equivalent of
//! `SELECT ... FOR UPDATE` row locking. A writer that cannot get the
//! lock within `busy_timeout` fails with the retryable
//! [`Error::Contention`] rather than deadlocking.

pub mod model;
pub mod schema;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::{Connection, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Database connection pool type alias.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Per-connection tuning applied on checkout: WAL for concurrent
/// readers, foreign keys on, and the lock-wait timeout.
#[derive(Debug, Clone, Copy)]
struct ConnectionTuning {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionTuning {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; \
             PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for the given database configuration.
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.max_connections)
        .connection_customizer(Box::new(ConnectionTuning {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Apply any pending embedded migrations.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = checkout(pool)?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    Ok(())
}

/// Get a connection from the pool.
pub(crate) fn checkout(
    pool: &DbPool,
) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>> {
    pool.get().map_err(|e| Error::Connection(e.to_string()))
}

/// Run `f` inside a single immediate (write-locked) transaction, off
/// the async executor.
///
/// Everything the closure does commits or rolls back together; partial
/// application is never observable by other readers.
pub(crate) async fn write_tx<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = checkout(&pool)?;
        conn.immediate_transaction(f)
    })
    .await
    .map_err(|e| Error::Database(format!("blocking task failed: {e}")))?
}

/// Run `f` on a plain read connection, off the async executor.
pub(crate) async fn read_only<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = checkout(&pool)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| Error::Database(format!("blocking task failed: {e}")))?
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        match &e {
            diesel::result::Error::DatabaseError(_, info)
                if info.message().contains("database is locked")
                    || info.message().contains("database table is locked") =>
            {
                Error::Contention(info.message().to_string())
            }
            _ => Error::Database(e.to_string()),
        }
    }
}
