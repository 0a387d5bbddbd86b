//! SQLite persistence adapters.
//!
//! Durable implementations of the ledger, risk state and performance ports
//! using Diesel ORM. All three share one connection pool.

pub mod database;
mod ledger;
mod performance;
mod risk_store;

pub use database::DbPool;
pub use ledger::SqliteLedger;
pub use performance::SqlitePerformanceStore;
pub use risk_store::SqliteRiskStore;

#[cfg(test)]
pub(crate) mod test_support {
    use super::database::{open, DbPool};

    /// File-backed pool in a temp dir. Keep the dir alive for the test.
    pub fn temp_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = dir.path().join("test.db").to_string_lossy().into_owned();
        let pool = open(&url).expect("open pool");
        (dir, pool)
    }
}
