//! SQLite risk state store with compare-and-swap writes.

use async_trait::async_trait;
use diesel::prelude::*;

use super::database::model::{ControlRow, RiskStateRow, CONTROL_ROW_ID};
use super::database::schema::{control_state, risk_states};
use super::database::{with_connection, DbPool};
use crate::domain::{AccountId, ControlState, RiskState};
use crate::error::{Error, Result};
use crate::port::RiskStateStore;

/// Durable per-account risk state and the global kill switch.
///
/// A CAS is a single conditional statement, so concurrent writers in
/// different processes sharing the database file cannot both win.
pub struct SqliteRiskStore {
    pool: DbPool,
}

impl SqliteRiskStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn version(version: u64) -> Result<i64> {
        i64::try_from(version).map_err(|_| Error::Parse(format!("version {version} out of range")))
    }
}

#[async_trait]
impl RiskStateStore for SqliteRiskStore {
    async fn load(&self, account_id: &AccountId) -> Result<Option<RiskState>> {
        let account_id = account_id.clone();
        with_connection(&self.pool, move |conn| {
            risk_states::table
                .find(account_id.as_str())
                .select(RiskStateRow::as_select())
                .first(conn)
                .optional()
                .map_err(|e| Error::Database(e.to_string()))?
                .map(RiskStateRow::into_state)
                .transpose()
        })
        .await
    }

    async fn compare_and_swap(&self, expected_version: u64, state: &RiskState) -> Result<bool> {
        let row = RiskStateRow::from_state(state, expected_version + 1)?;
        let expected = Self::version(expected_version)?;
        let account_id = state.account_id.clone();
        with_connection(&self.pool, move |conn| {
            let affected = if expected == 0 {
                diesel::insert_or_ignore_into(risk_states::table)
                    .values(&row)
                    .execute(conn)
            } else {
                diesel::update(
                    risk_states::table
                        .filter(risk_states::account_id.eq(account_id.as_str()))
                        .filter(risk_states::version.eq(expected)),
                )
                .set(&row)
                .execute(conn)
            }
            .map_err(|e| Error::Database(e.to_string()))?;

            Ok(affected == 1)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<RiskState>> {
        with_connection(&self.pool, |conn| {
            let rows: Vec<RiskStateRow> = risk_states::table
                .order(risk_states::account_id.asc())
                .select(RiskStateRow::as_select())
                .load(conn)
                .map_err(|e| Error::Database(e.to_string()))?;

            rows.into_iter().map(RiskStateRow::into_state).collect()
        })
        .await
    }

    async fn load_control(&self) -> Result<ControlState> {
        with_connection(&self.pool, |conn| {
            let row: Option<ControlRow> = control_state::table
                .find(CONTROL_ROW_ID)
                .select(ControlRow::as_select())
                .first(conn)
                .optional()
                .map_err(|e| Error::Database(e.to_string()))?;

            row.map_or_else(|| Ok(ControlState::default()), ControlRow::into_control)
        })
        .await
    }

    async fn swap_control(&self, expected_version: u64, control: &ControlState) -> Result<bool> {
        let row = ControlRow::from_control(control, expected_version + 1)?;
        let expected = Self::version(expected_version)?;
        with_connection(&self.pool, move |conn| {
            let affected = if expected == 0 {
                diesel::insert_or_ignore_into(control_state::table)
                    .values(&row)
                    .execute(conn)
            } else {
                diesel::update(
                    control_state::table
                        .filter(control_state::id.eq(CONTROL_ROW_ID))
                        .filter(control_state::version.eq(expected)),
                )
                .set(&row)
                .execute(conn)
            }
            .map_err(|e| Error::Database(e.to_string()))?;

            Ok(affected == 1)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::test_support::temp_pool;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn cas_rejects_stale_versions() {
        let (_dir, pool) = temp_pool();
        let store = SqliteRiskStore::new(pool);
        let mut state = RiskState::new(AccountId::from("acct"), dec!(100000));

        assert!(store.compare_and_swap(0, &state).await.unwrap());
        assert!(!store.compare_and_swap(0, &state).await.unwrap());

        state.update_high_water_mark(dec!(94000));
        state.halt("drawdown 6.00% exceeds 5.00% threshold");
        assert!(store.compare_and_swap(1, &state).await.unwrap());
        assert!(!store.compare_and_swap(1, &state).await.unwrap());

        let loaded = store.load(&AccountId::from("acct")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert!(!loaded.trading_enabled);
        assert_eq!(loaded.high_water_mark, dec!(100000));
        assert_eq!(loaded.drawdown_pct, dec!(0.06));
    }

    #[tokio::test]
    async fn state_survives_a_new_pool() {
        let (dir, pool) = temp_pool();
        let store = SqliteRiskStore::new(pool);
        let mut state = RiskState::new(AccountId::from("acct"), dec!(100));
        state.halt("manual");
        assert!(store.compare_and_swap(0, &state).await.unwrap());
        drop(store);

        let url = dir.path().join("test.db").to_string_lossy().into_owned();
        let reopened = SqliteRiskStore::new(crate::adapter::outbound::sqlite::database::open(&url).unwrap());
        let loaded = reopened.load(&AccountId::from("acct")).await.unwrap().unwrap();
        assert!(!loaded.trading_enabled);
        assert_eq!(loaded.halt_reason.as_deref(), Some("manual"));
        assert_eq!(reopened.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn control_defaults_and_swaps() {
        let (_dir, pool) = temp_pool();
        let store = SqliteRiskStore::new(pool);

        let control = store.load_control().await.unwrap();
        assert!(!control.halted);
        assert_eq!(control.version, 0);

        let halted = ControlState {
            halted: true,
            reason: Some("operator".into()),
            ..control
        };
        assert!(store.swap_control(0, &halted).await.unwrap());
        assert!(!store.swap_control(0, &halted).await.unwrap());

        let loaded = store.load_control().await.unwrap();
        assert!(loaded.halted);
        assert_eq!(loaded.version, 1);
    }
}
