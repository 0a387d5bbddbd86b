//! Signal aggregator configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::aggregator::AggregatorSettings;

/// Weighting, systemic override and signing (`[aggregator]`).
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Performance records considered per module.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_reference_capital")]
    pub reference_capital: Decimal,
    #[serde(default)]
    pub daily_risk_free_rate: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default = "default_active_sharpe")]
    pub active_sharpe: f64,
    #[serde(default = "default_reduced_sharpe")]
    pub reduced_sharpe: f64,
    #[serde(default = "default_systemic_sell_threshold")]
    pub systemic_sell_threshold: usize,
    #[serde(default = "default_signer_id")]
    pub signer_id: String,
    /// How long used nonces are remembered, in seconds.
    #[serde(default = "default_replay_retention_secs")]
    pub replay_retention_secs: u64,
}

const fn default_lookback() -> usize {
    30
}

fn default_reference_capital() -> Decimal {
    Decimal::from(100_000)
}

const fn default_periods_per_year() -> f64 {
    252.0
}

const fn default_active_sharpe() -> f64 {
    1.0
}

const fn default_reduced_sharpe() -> f64 {
    0.5
}

const fn default_systemic_sell_threshold() -> usize {
    3
}

fn default_signer_id() -> String {
    "orchestrator".into()
}

const fn default_replay_retention_secs() -> u64 {
    86_400
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            reference_capital: default_reference_capital(),
            daily_risk_free_rate: 0.0,
            periods_per_year: default_periods_per_year(),
            active_sharpe: default_active_sharpe(),
            reduced_sharpe: default_reduced_sharpe(),
            systemic_sell_threshold: default_systemic_sell_threshold(),
            signer_id: default_signer_id(),
            replay_retention_secs: default_replay_retention_secs(),
        }
    }
}

impl AggregatorConfig {
    #[must_use]
    pub fn replay_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.replay_retention_secs).unwrap_or(86_400))
    }
}

impl From<AggregatorConfig> for AggregatorSettings {
    fn from(config: AggregatorConfig) -> Self {
        Self {
            lookback: config.lookback,
            reference_capital: config.reference_capital,
            daily_risk_free_rate: config.daily_risk_free_rate,
            periods_per_year: config.periods_per_year,
            active_sharpe: config.active_sharpe,
            reduced_sharpe: config.reduced_sharpe,
            systemic_sell_threshold: config.systemic_sell_threshold,
            signer_id: config.signer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settings() {
        assert_eq!(
            AggregatorSettings::from(AggregatorConfig::default()),
            AggregatorSettings::default()
        );
    }
}
