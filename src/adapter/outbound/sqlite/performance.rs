//! SQLite performance history.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::model::{NewPerformanceRow, PerformanceRow};
use super::database::schema::performance_records;
use super::database::{with_connection, DbPool};
use crate::domain::{ModuleId, PerformanceRecord};
use crate::error::{Error, Result};
use crate::port::PerformanceStore;

/// Append-only per-module PnL records.
pub struct SqlitePerformanceStore {
    pool: DbPool,
}

impl SqlitePerformanceStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PerformanceStore for SqlitePerformanceStore {
    async fn append(&self, record: &PerformanceRecord) -> Result<()> {
        let row = NewPerformanceRow::from(record);
        with_connection(&self.pool, move |conn| {
            diesel::insert_into(performance_records::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn recent(
        &self,
        module_id: &ModuleId,
        lookback: usize,
    ) -> Result<Vec<PerformanceRecord>> {
        let module_id = module_id.clone();
        let limit = i64::try_from(lookback).unwrap_or(i64::MAX);
        with_connection(&self.pool, move |conn| {
            let mut rows: Vec<PerformanceRow> = performance_records::table
                .filter(performance_records::module_id.eq(module_id.as_str()))
                .order(performance_records::period_end.desc())
                .limit(limit)
                .select(PerformanceRow::as_select())
                .load(conn)
                .map_err(|e| Error::Database(e.to_string()))?;
            rows.reverse();

            rows.into_iter().map(PerformanceRow::into_record).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::test_support::temp_pool;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(module: &str, day: i64, pnl: Decimal) -> PerformanceRecord {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(day);
        PerformanceRecord {
            module_id: ModuleId::from(module),
            period_start: start,
            period_end: start + Duration::days(1),
            realized_pnl: pnl,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn recent_returns_last_records_oldest_first() {
        let (_dir, pool) = temp_pool();
        let store = SqlitePerformanceStore::new(pool);
        for day in [3, 0, 2, 1] {
            store
                .append(&record("alpha", day, Decimal::from(day)))
                .await
                .unwrap();
        }
        store.append(&record("beta", 0, dec!(-1))).await.unwrap();

        let recent = store.recent(&ModuleId::from("alpha"), 3).await.unwrap();
        let pnl: Vec<Decimal> = recent.iter().map(|r| r.realized_pnl).collect();
        assert_eq!(pnl, vec![dec!(1), dec!(2), dec!(3)]);

        assert_eq!(store.recent(&ModuleId::from("beta"), 30).await.unwrap().len(), 1);
        assert!(store.recent(&ModuleId::from("gamma"), 30).await.unwrap().is_empty());
    }
}
