//! Trading account configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapter::outbound::paper::FillMode;

/// One brokerage account (`[[accounts]]`).
///
/// Each account runs its own pipeline against a paper broker.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    /// Symbols traded by this account. Empty means every strategy symbol.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Opening cash of the paper broker.
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    /// `immediate` fills limit orders at once, `resting` leaves them open.
    #[serde(default)]
    pub fill_mode: FillModeConfig,
}

fn default_starting_cash() -> Decimal {
    Decimal::from(100_000)
}

/// Paper broker fill behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillModeConfig {
    #[default]
    Immediate,
    Resting,
}

impl From<FillModeConfig> for FillMode {
    fn from(mode: FillModeConfig) -> Self {
        match mode {
            FillModeConfig::Immediate => Self::Immediate,
            FillModeConfig::Resting => Self::Resting,
        }
    }
}
