//! Execution router configuration.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::execution::ExecutionSettings;

/// Cost analysis and broker timeouts (`[execution]`).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Widest relative spread still executed (0.001 = 10 bps).
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: Decimal,
    #[serde(default = "default_limit_buffer_pct")]
    pub limit_buffer_pct: Decimal,
    #[serde(default = "default_broker_timeout_ms")]
    pub broker_timeout_ms: u64,
    /// Age after which PENDING intents are reconciled.
    #[serde(default = "default_pending_timeout_secs")]
    pub pending_timeout_secs: u64,
}

fn default_max_spread_pct() -> Decimal {
    Decimal::new(1, 3)
}

fn default_limit_buffer_pct() -> Decimal {
    Decimal::new(5, 3)
}

const fn default_broker_timeout_ms() -> u64 {
    5_000
}

const fn default_pending_timeout_secs() -> u64 {
    60
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_spread_pct: default_max_spread_pct(),
            limit_buffer_pct: default_limit_buffer_pct(),
            broker_timeout_ms: default_broker_timeout_ms(),
            pending_timeout_secs: default_pending_timeout_secs(),
        }
    }
}

impl From<ExecutionConfig> for ExecutionSettings {
    fn from(config: ExecutionConfig) -> Self {
        Self {
            max_spread_pct: config.max_spread_pct,
            limit_buffer_pct: config.limit_buffer_pct,
            broker_timeout: Duration::from_millis(config.broker_timeout_ms),
            pending_timeout: chrono::Duration::seconds(
                i64::try_from(config.pending_timeout_secs).unwrap_or(60),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings() {
        assert_eq!(
            ExecutionSettings::from(ExecutionConfig::default()),
            ExecutionSettings::default()
        );
    }
}
