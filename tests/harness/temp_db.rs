use std::sync::Arc;

use tempfile::TempDir;
use warden::adapter::outbound::sqlite::database::open;
use warden::adapter::outbound::sqlite::{
    DbPool, SqliteLedger, SqlitePerformanceStore, SqliteRiskStore,
};
use warden::infrastructure::bootstrap::Stores;

/// Temporary SQLite database for integration tests.
///
/// The file lives in its own temp directory and is removed on drop.
pub struct TempDb {
    _dir: TempDir,
    url: String,
    pool: DbPool,
}

impl TempDb {
    pub fn create() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = dir.path().join("warden.db").to_string_lossy().into_owned();
        let pool = open(&url).expect("open sqlite database");
        Self {
            _dir: dir,
            url,
            pool,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// A fresh pool on the same file, as a restarted process would see it.
    pub fn reopen(&self) -> DbPool {
        open(&self.url).expect("reopen sqlite database")
    }

    /// Store bundle backed by a fresh pool on this file.
    pub fn stores(&self) -> Stores {
        let pool = self.reopen();
        Stores {
            ledger: Arc::new(SqliteLedger::new(pool.clone())),
            risk: Arc::new(SqliteRiskStore::new(pool.clone())),
            performance: Arc::new(SqlitePerformanceStore::new(pool)),
        }
    }
}
