//! Signals emitted by decision modules.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ModuleId, Symbol};

/// Action proposed by a decision module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    CloseAll,
}

impl Action {
    /// Canonical wire name, stable across releases (part of the signed payload).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
            Self::CloseAll => "CLOSE_ALL",
        }
    }

    /// True for actions that may produce an order.
    #[must_use]
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset class of the traded instrument. Determines lot precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    #[default]
    Equity,
    Crypto,
}

impl AssetClass {
    /// Decimal places allowed for order quantities.
    #[must_use]
    pub const fn quantity_scale(self) -> u32 {
        match self {
            Self::Equity => 0,
            Self::Crypto => 8,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One module's output for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub module_id: ModuleId,
    pub action: Action,
    pub symbol: Symbol,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Fraction of buying power the module wants committed, in [0, 1].
    pub target_allocation: Decimal,
    pub reasoning: String,
    pub asset_class: AssetClass,
    pub timestamp: DateTime<Utc>,
    /// Set when this signal replaces a module that failed to evaluate.
    pub error: Option<String>,
}

impl StrategySignal {
    /// Build a signal, clamping confidence and allocation into [0, 1].
    pub fn new(
        module_id: ModuleId,
        action: Action,
        symbol: Symbol,
        confidence: f64,
        target_allocation: Decimal,
        reasoning: impl Into<String>,
        asset_class: AssetClass,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            module_id,
            action,
            symbol,
            confidence,
            target_allocation: target_allocation.clamp(Decimal::ZERO, Decimal::ONE),
            reasoning: reasoning.into(),
            asset_class,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Neutral HOLD / 0-confidence signal standing in for a failed module.
    pub fn neutral(module_id: ModuleId, symbol: Symbol, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            module_id,
            action: Action::Hold,
            symbol,
            confidence: 0.0,
            target_allocation: Decimal::ZERO,
            reasoning: format!("module failed: {error}"),
            asset_class: AssetClass::default(),
            timestamp: Utc::now(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_clamps_confidence_and_allocation() {
        let s = StrategySignal::new(
            ModuleId::from("m"),
            Action::Buy,
            Symbol::from("AAPL"),
            1.7,
            dec!(2),
            "r",
            AssetClass::Equity,
        );
        assert_eq!(s.confidence, 1.0);
        assert_eq!(s.target_allocation, Decimal::ONE);

        let s = StrategySignal::new(
            ModuleId::from("m"),
            Action::Buy,
            Symbol::from("AAPL"),
            f64::NAN,
            dec!(-1),
            "r",
            AssetClass::Equity,
        );
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.target_allocation, Decimal::ZERO);
    }

    #[test]
    fn neutral_signal_is_hold_with_error() {
        let s = StrategySignal::neutral(ModuleId::from("m"), Symbol::from("X"), "boom");
        assert_eq!(s.action, Action::Hold);
        assert_eq!(s.confidence, 0.0);
        assert!(s.is_error());
        assert!(s.reasoning.contains("boom"));
    }

    #[test]
    fn action_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Action::CloseAll).unwrap(), "\"CLOSE_ALL\"");
    }
}
