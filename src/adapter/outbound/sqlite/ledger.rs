//! SQLite execution ledger.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::model::LedgerRow;
use super::database::schema::ledger_entries;
use super::database::{with_connection, DbPool};
use crate::domain::{IntentId, LedgerEntry, LedgerStatus, LedgerUpdate};
use crate::error::{Error, Result};
use crate::port::LedgerStore;

/// Durable ledger keyed by intent id.
///
/// Every write is committed before the call returns, so an entry created
/// before a broker call survives a crash during that call.
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn find(conn: &mut SqliteConnection, intent_id: &IntentId) -> Result<Option<LedgerEntry>> {
        ledger_entries::table
            .find(intent_id.as_str())
            .select(LedgerRow::as_select())
            .first(conn)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?
            .map(LedgerRow::into_entry)
            .transpose()
    }
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn create(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let row = LedgerRow::from_entry(entry)?;
        let intent_id = entry.intent_id.clone();
        with_connection(&self.pool, move |conn| {
            diesel::insert_or_ignore_into(ledger_entries::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| Error::Database(e.to_string()))?;

            Self::find(conn, &intent_id)?
                .ok_or_else(|| Error::Database(format!("ledger entry {intent_id} vanished")))
        })
        .await
    }

    async fn merge(
        &self,
        intent_id: &IntentId,
        update: &LedgerUpdate,
    ) -> Result<Option<LedgerEntry>> {
        let intent_id = intent_id.clone();
        let update = update.clone();
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let Some(mut entry) = Self::find(conn, &intent_id)? else {
                    return Ok(None);
                };
                if update.apply_to(&mut entry) {
                    let row = LedgerRow::from_entry(&entry)?;
                    diesel::update(ledger_entries::table.find(intent_id.as_str()))
                        .set(&row)
                        .execute(conn)?;
                }
                Ok(Some(entry))
            })
        })
        .await
    }

    async fn get(&self, intent_id: &IntentId) -> Result<Option<LedgerEntry>> {
        let intent_id = intent_id.clone();
        with_connection(&self.pool, move |conn| Self::find(conn, &intent_id)).await
    }

    async fn by_status(&self, status: LedgerStatus) -> Result<Vec<LedgerEntry>> {
        with_connection(&self.pool, move |conn| {
            let rows: Vec<LedgerRow> = ledger_entries::table
                .filter(ledger_entries::status.eq(status.as_str()))
                .order(ledger_entries::created_at.asc())
                .select(LedgerRow::as_select())
                .load(conn)
                .map_err(|e| Error::Database(e.to_string()))?;

            rows.into_iter().map(LedgerRow::into_entry).collect()
        })
        .await
    }
}
