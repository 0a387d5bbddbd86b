//! Trailing performance of decision modules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ModuleId;

/// PnL attributed to one module over one period. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub module_id: ModuleId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
}

impl PerformanceRecord {
    /// Total PnL for the period.
    #[must_use]
    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl
    }
}
