//! Database connection management using Diesel ORM.
//!
//! Provides connection pooling, migration support, and connection
//! configuration for SQLite databases.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

const PRAGMAS: &str =
    "PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;";

#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(PRAGMAS)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Create a connection pool for the given database URL.
///
/// Every pooled connection gets the pragmas from
/// [`configure_sqlite_connection`].
///
/// # Errors
/// Returns an error if the pool cannot be created.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(5)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .map_err(|e| Error::Connection(e.to_string()))
}

/// Run all pending database migrations.
///
/// # Errors
/// Returns an error if migrations fail.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(())
}

/// Open a pool on `database_url` and bring its schema up to date.
///
/// # Errors
/// Returns an error if the pool cannot be created or migrations fail.
pub fn open(database_url: &str) -> Result<DbPool> {
    let pool = create_pool(database_url)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Run `work` on a pooled connection on tokio's blocking pool.
///
/// Diesel and r2d2 block; running them here keeps runtime workers free and
/// lets callers bound the call with `tokio::time::timeout`.
///
/// # Errors
/// Returns an error if no connection is available, `work` fails, or the
/// blocking task panics.
pub async fn with_connection<T, F>(pool: &DbPool, work: F) -> Result<T>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
        work(&mut conn)
    })
    .await
    .map_err(|e| Error::Database(format!("database task failed: {e}")))?
}

/// Configure SQLite connection pragmas.
///
/// WAL lets the ledger be read while a cycle writes to it.
///
/// # Errors
/// Returns an error if a pragma fails to apply.
pub fn configure_sqlite_connection(conn: &mut SqliteConnection) -> Result<()> {
    conn.batch_execute(PRAGMAS)
        .map_err(|e| Error::Database(e.to_string()))
}

impl From<diesel::result::Error> for Error {
    fn from(e: diesel::result::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::RunQueryDsl;

    #[derive(diesel::QueryableByName)]
    struct TableName {
        #[diesel(sql_type = diesel::sql_types::Text)]
        name: String,
    }

    #[derive(diesel::QueryableByName)]
    struct TableCount {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        count: i64,
    }

    fn temp_url(dir: &tempfile::TempDir) -> String {
        dir.path().join("warden.db").to_string_lossy().into_owned()
    }

    #[test]
    fn run_migrations_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(&temp_url(&dir)).unwrap();
        let mut conn = pool.get().unwrap();

        let tables: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '__diesel_schema_migrations' ORDER BY name",
        )
        .load::<TableName>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

        assert_eq!(
            tables,
            vec![
                "control_state".to_string(),
                "ledger_entries".to_string(),
                "performance_records".to_string(),
                "risk_states".to_string(),
            ]
        );
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&temp_url(&dir)).unwrap();
        run_migrations(&pool).unwrap();
        run_migrations(&pool).unwrap();

        let mut conn = pool.get().unwrap();
        let count = diesel::sql_query(
            "SELECT COUNT(*) as count FROM sqlite_master WHERE type='table' AND name='ledger_entries'",
        )
        .load::<TableCount>(&mut conn)
        .unwrap()[0]
            .count;
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn slow_database_work_can_be_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open(&temp_url(&dir)).unwrap();

        let slow = with_connection(&pool, |_conn| {
            std::thread::sleep(std::time::Duration::from_millis(300));
            Ok(())
        });
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), slow).await;
        assert!(outcome.is_err());

        let count = with_connection(&pool, |conn| {
            let rows: Vec<TableCount> =
                diesel::sql_query("SELECT COUNT(*) as count FROM sqlite_master").load(conn)?;
            Ok(rows[0].count)
        })
        .await
        .unwrap();
        assert!(count > 0);
    }

    #[test]
    fn schema_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = temp_url(&dir);
        drop(open(&url).unwrap());
        let pool = open(&url).unwrap();
        assert!(pool.get().is_ok());
    }

    #[test]
    fn connection_handles_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(open(&temp_url(&dir)).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    let mut conn = pool.get().unwrap();
                    let result: Vec<TableCount> =
                        diesel::sql_query("SELECT COUNT(*) as count FROM sqlite_master")
                            .load(&mut conn)
                            .unwrap();
                    assert!(!result.is_empty());
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread should not panic");
        }
    }
}
