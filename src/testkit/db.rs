//! Migrated throwaway databases for tests.

use std::path::PathBuf;

use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::{self, DbPool};

/// In-memory pool limited to a single connection (each SQLite `:memory:`
/// connection is its own database), with migrations applied. Right for
/// sequential tests.
pub fn memory_pool() -> DbPool {
    let config = DatabaseConfig {
        url: ":memory:".into(),
        max_connections: 1,
        ..DatabaseConfig::default()
    };
    let pool = db::create_pool(&config).expect("create in-memory pool");
    db::run_migrations(&pool).expect("run migrations");
    pool
}

/// On-disk database under the system temp directory, removed on drop.
/// Use for tests that need real cross-connection concurrency.
pub struct TempDb {
    path: PathBuf,
}

impl TempDb {
    /// Create the database file and apply migrations.
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("waybill-test-{}.db", Uuid::new_v4()));
        let this = Self { path };
        let pool = this.pool(1);
        db::run_migrations(&pool).expect("run migrations");
        this
    }

    /// A pool of `max_connections` connections onto this database.
    pub fn pool(&self, max_connections: u32) -> DbPool {
        let config = DatabaseConfig {
            url: self.path.display().to_string(),
            max_connections,
            ..DatabaseConfig::default()
        };
        db::create_pool(&config).expect("create temp-file pool")
    }
}

impl Default for TempDb {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(path));
        }
    }
}
