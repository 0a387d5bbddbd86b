//! Database model types for Diesel ORM.
//!
//! Decimals are stored as TEXT to keep exact precision. Timestamps are
//! fixed-width RFC 3339 so that text ordering matches time ordering.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{control_state, ledger_entries, performance_records, risk_states};
use crate::domain::{
    AccountId, BrokerOrderId, ControlState, IntentId, IntentState, LedgerEntry, LedgerStatus,
    ModuleId, OrderSide, PerformanceRecord, RiskState, Symbol,
};
use crate::error::{Error, Result};

/// Primary key of the single kill-switch row.
pub const CONTROL_ROW_ID: i32 = 1;

pub(crate) fn format_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp '{value}': {e}")))
}

fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Parse(format!("decimal '{value}': {e}")))
}

fn to_version(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| Error::Parse(format!("version {version} out of range")))
}

fn from_version(version: i64) -> Result<u64> {
    u64::try_from(version).map_err(|_| Error::Parse(format!("negative version {version}")))
}

/// Database row for a ledger entry.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = ledger_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct LedgerRow {
    pub intent_id: String,
    pub account_id: String,
    pub module_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: String,
    pub limit_price: Option<String>,
    pub status: String,
    pub intent_state: String,
    pub broker_order_id: Option<String>,
    pub response: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub history: String,
}

impl LedgerRow {
    pub fn from_entry(entry: &LedgerEntry) -> Result<Self> {
        Ok(Self {
            intent_id: entry.intent_id.to_string(),
            account_id: entry.account_id.to_string(),
            module_id: entry.module_id.to_string(),
            symbol: entry.symbol.to_string(),
            side: entry.side.as_str().to_string(),
            quantity: entry.quantity.to_string(),
            limit_price: entry.limit_price.map(|p| p.to_string()),
            status: entry.status.as_str().to_string(),
            intent_state: entry.intent_state.as_str().to_string(),
            broker_order_id: entry.broker_order_id.as_ref().map(ToString::to_string),
            response: entry.response.clone(),
            created_at: format_time(&entry.created_at),
            updated_at: format_time(&entry.updated_at),
            history: serde_json::to_string(&entry.history)?,
        })
    }

    pub fn into_entry(self) -> Result<LedgerEntry> {
        Ok(LedgerEntry {
            side: OrderSide::parse(&self.side)
                .ok_or_else(|| Error::Parse(format!("order side '{}'", self.side)))?,
            status: LedgerStatus::parse(&self.status)
                .ok_or_else(|| Error::Parse(format!("ledger status '{}'", self.status)))?,
            intent_state: IntentState::parse(&self.intent_state)
                .ok_or_else(|| Error::Parse(format!("intent state '{}'", self.intent_state)))?,
            quantity: parse_decimal(&self.quantity)?,
            limit_price: self.limit_price.as_deref().map(parse_decimal).transpose()?,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
            history: serde_json::from_str(&self.history)?,
            intent_id: IntentId::from_persisted(self.intent_id),
            account_id: AccountId::from(self.account_id),
            module_id: ModuleId::from(self.module_id),
            symbol: Symbol::from(self.symbol),
            broker_order_id: self.broker_order_id.map(BrokerOrderId::from),
            response: self.response,
        })
    }
}

/// Database row for an account's risk state.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = risk_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct RiskStateRow {
    pub account_id: String,
    pub high_water_mark: String,
    pub current_equity: String,
    pub drawdown_pct: String,
    pub trading_enabled: bool,
    pub halt_reason: Option<String>,
    pub breached_at: Option<String>,
    pub trades_in_period: i32,
    pub period_started_at: String,
    pub last_updated: String,
    pub version: i64,
}

impl RiskStateRow {
    /// Row for `state` stored under `version`.
    pub fn from_state(state: &RiskState, version: u64) -> Result<Self> {
        Ok(Self {
            account_id: state.account_id.to_string(),
            high_water_mark: state.high_water_mark.to_string(),
            current_equity: state.current_equity.to_string(),
            drawdown_pct: state.drawdown_pct.to_string(),
            trading_enabled: state.trading_enabled,
            halt_reason: state.halt_reason.clone(),
            breached_at: state.breached_at.as_ref().map(format_time),
            trades_in_period: i32::try_from(state.trades_in_period).unwrap_or(i32::MAX),
            period_started_at: format_time(&state.period_started_at),
            last_updated: format_time(&state.last_updated),
            version: to_version(version)?,
        })
    }

    pub fn into_state(self) -> Result<RiskState> {
        Ok(RiskState {
            high_water_mark: parse_decimal(&self.high_water_mark)?,
            current_equity: parse_decimal(&self.current_equity)?,
            drawdown_pct: parse_decimal(&self.drawdown_pct)?,
            breached_at: self.breached_at.as_deref().map(parse_time).transpose()?,
            trades_in_period: u32::try_from(self.trades_in_period).unwrap_or(0),
            period_started_at: parse_time(&self.period_started_at)?,
            last_updated: parse_time(&self.last_updated)?,
            version: from_version(self.version)?,
            account_id: AccountId::from(self.account_id),
            trading_enabled: self.trading_enabled,
            halt_reason: self.halt_reason,
        })
    }
}

/// Database row for the global kill switch.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = control_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct ControlRow {
    pub id: i32,
    pub halted: bool,
    pub reason: Option<String>,
    pub updated_at: String,
    pub version: i64,
}

impl ControlRow {
    pub fn from_control(control: &ControlState, version: u64) -> Result<Self> {
        Ok(Self {
            id: CONTROL_ROW_ID,
            halted: control.halted,
            reason: control.reason.clone(),
            updated_at: format_time(&control.updated_at),
            version: to_version(version)?,
        })
    }

    pub fn into_control(self) -> Result<ControlState> {
        Ok(ControlState {
            halted: self.halted,
            reason: self.reason,
            updated_at: parse_time(&self.updated_at)?,
            version: from_version(self.version)?,
        })
    }
}

/// Database row for a performance record (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = performance_records)]
pub struct NewPerformanceRow {
    pub module_id: String,
    pub period_start: String,
    pub period_end: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
}

impl From<&PerformanceRecord> for NewPerformanceRow {
    fn from(record: &PerformanceRecord) -> Self {
        Self {
            module_id: record.module_id.to_string(),
            period_start: format_time(&record.period_start),
            period_end: format_time(&record.period_end),
            realized_pnl: record.realized_pnl.to_string(),
            unrealized_pnl: record.unrealized_pnl.to_string(),
        }
    }
}

/// Database row for a performance record (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = performance_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PerformanceRow {
    pub id: Option<i32>,
    pub module_id: String,
    pub period_start: String,
    pub period_end: String,
    pub realized_pnl: String,
    pub unrealized_pnl: String,
}

impl PerformanceRow {
    pub fn into_record(self) -> Result<PerformanceRecord> {
        Ok(PerformanceRecord {
            period_start: parse_time(&self.period_start)?,
            period_end: parse_time(&self.period_end)?,
            realized_pnl: parse_decimal(&self.realized_pnl)?,
            unrealized_pnl: parse_decimal(&self.unrealized_pnl)?,
            module_id: ModuleId::from(self.module_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn timestamps_sort_as_text() {
        let early = parse_time("2026-03-01T10:00:05Z").unwrap();
        let late = parse_time("2026-03-01T10:00:05.5Z").unwrap();
        assert!(format_time(&early) < format_time(&late));
    }

    #[test]
    fn risk_state_row_keeps_decimal_precision() {
        let mut state = RiskState::new(AccountId::from("acct"), dec!(100000.123456));
        state.update_high_water_mark(dec!(95000.000001));
        state.halt("drawdown");
        let restored = RiskStateRow::from_state(&state, 7)
            .unwrap()
            .into_state()
            .unwrap();
        assert_eq!(restored.high_water_mark, dec!(100000.123456));
        assert_eq!(restored.current_equity, dec!(95000.000001));
        assert_eq!(restored.version, 7);
        assert!(!restored.trading_enabled);
        assert!(restored.breached_at.is_some());
    }

    #[test]
    fn malformed_decimal_is_a_parse_error() {
        let mut row = RiskStateRow::from_state(&RiskState::new(AccountId::from("a"), dec!(1)), 1)
            .unwrap();
        row.current_equity = "abc".into();
        assert!(matches!(row.into_state(), Err(Error::Parse(_))));
    }
}
