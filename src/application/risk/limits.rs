//! Risk limits enforced by the gate.

use std::time::Duration;

use rust_decimal::Decimal;

/// Circuit-breaker and pre-trade limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskLimits {
    /// Drawdown from the high-water mark that halts the account (0.05 = 5%).
    pub max_drawdown_pct: Decimal,
    /// Maximum absolute position quantity per symbol after a trade.
    pub max_position_quantity: Decimal,
    /// Trades allowed per period.
    pub max_trades_per_period: u32,
    pub trade_period: chrono::Duration,
    /// Share of equity one symbol may take before BUYs are downgraded.
    pub max_concentration_pct: Decimal,
    /// Bound on every risk-state read and write.
    pub state_timeout: Duration,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_drawdown_pct: Decimal::new(5, 2),
            max_position_quantity: Decimal::from(10_000),
            max_trades_per_period: 50,
            trade_period: chrono::Duration::days(1),
            max_concentration_pct: Decimal::new(20, 2),
            state_timeout: Duration::from_millis(2_000),
        }
    }
}
