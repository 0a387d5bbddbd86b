//! Risk gate configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::risk::RiskLimits;

/// Circuit breaker and pre-trade limits (`[risk]`).
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Drawdown from the high-water mark that halts an account (0.05 = 5%).
    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: Decimal,
    /// Maximum absolute quantity per symbol after a trade.
    #[serde(default = "default_max_position_quantity")]
    pub max_position_quantity: Decimal,
    #[serde(default = "default_max_trades_per_period")]
    pub max_trades_per_period: u32,
    /// Length of the trade-counting period in seconds (default: one day).
    #[serde(default = "default_trade_period_secs")]
    pub trade_period_secs: u64,
    /// Share of equity one symbol may hold before BUYs are downgraded.
    #[serde(default = "default_max_concentration_pct")]
    pub max_concentration_pct: Decimal,
    /// Timeout for risk state reads and writes.
    #[serde(default = "default_state_timeout_ms")]
    pub state_timeout_ms: u64,
}

fn default_max_drawdown_pct() -> Decimal {
    Decimal::new(5, 2)
}

fn default_max_position_quantity() -> Decimal {
    Decimal::from(10_000)
}

const fn default_max_trades_per_period() -> u32 {
    50
}

const fn default_trade_period_secs() -> u64 {
    86_400
}

fn default_max_concentration_pct() -> Decimal {
    Decimal::new(20, 2)
}

const fn default_state_timeout_ms() -> u64 {
    2_000
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_drawdown_pct: default_max_drawdown_pct(),
            max_position_quantity: default_max_position_quantity(),
            max_trades_per_period: default_max_trades_per_period(),
            trade_period_secs: default_trade_period_secs(),
            max_concentration_pct: default_max_concentration_pct(),
            state_timeout_ms: default_state_timeout_ms(),
        }
    }
}

impl From<RiskConfig> for RiskLimits {
    fn from(config: RiskConfig) -> Self {
        Self {
            max_drawdown_pct: config.max_drawdown_pct,
            max_position_quantity: config.max_position_quantity,
            max_trades_per_period: config.max_trades_per_period,
            trade_period: chrono::Duration::seconds(
                i64::try_from(config.trade_period_secs).unwrap_or(i64::MAX / 1_000),
            ),
            max_concentration_pct: config.max_concentration_pct,
            state_timeout: Duration::from_millis(config.state_timeout_ms),
        }
    }
}
