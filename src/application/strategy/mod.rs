//! Decision-module abstraction and registry.
//!
//! Each decision module implements [`DecisionModule`] and is created by a
//! [`ModuleFactory`] registered under a `kind`. The [`StrategyRegistry`]
//! instantiates configured modules and evaluates them concurrently:
//!
//! - **`regime_bias`** - trades the dealer-gamma / volatility regime
//! - **`spread_reversion`** - fades deviations of the mid from a fair value
//!
//! # Example
//!
//! ```ignore
//! use warden::application::strategy::StrategyRegistry;
//!
//! let mut registry = StrategyRegistry::with_builtin(4, Duration::from_secs(2));
//! let report = registry.discover(&config.strategies);
//! let signals = registry.evaluate_all(market, account, regime).await;
//! ```

pub mod builtin;
mod registry;

pub use registry::{DiscoveryReport, SkippedModule, StrategyRegistry};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::{
    AccountSnapshot, AssetClass, MarketSnapshot, ModuleId, RegimeSnapshot, StrategySignal, Symbol,
};
use crate::error::{Error, Result};

/// Read-only inputs shared by every module in a cycle.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub market: MarketSnapshot,
    pub account: AccountSnapshot,
    pub regime: RegimeSnapshot,
}

/// A trading-decision module.
///
/// Modules are independent: they see the same snapshot and never each
/// other's output.
#[async_trait]
pub trait DecisionModule: Send + Sync {
    /// Unique identifier, used for weighting and attribution.
    fn id(&self) -> &ModuleId;

    /// Symbol the module trades. Used for the neutral signal on failure.
    fn symbol(&self) -> &Symbol;

    /// Produce this cycle's signal.
    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<StrategySignal>;
}

/// Creates modules of one kind from configuration.
pub trait ModuleFactory: Send + Sync {
    /// Kind name matched against `ModuleConfig::kind`.
    fn kind(&self) -> &'static str;

    /// Instantiate a module.
    ///
    /// # Errors
    /// Returns an error if the configuration is unusable.
    fn init(&self, config: &ModuleConfig) -> Result<Box<dyn DecisionModule>>;
}

/// Configuration of one decision module (`[[strategies]]`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    pub id: String,
    pub kind: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub symbol: String,
    #[serde(default)]
    pub asset_class: AssetClass,
    /// Allocation requested when the module acts.
    #[serde(default = "default_allocation")]
    pub allocation: Decimal,
    /// Module-specific parameters.
    #[serde(default)]
    pub params: toml::Table,
}

const fn default_enabled() -> bool {
    true
}

fn default_allocation() -> Decimal {
    Decimal::new(10, 2)
}

impl ModuleConfig {
    /// Read a numeric parameter, falling back to `default` when absent.
    ///
    /// # Errors
    /// Returns an error if the parameter exists but is not a number.
    pub fn param_f64(&self, name: &str, default: f64) -> Result<f64> {
        match self.params.get(name) {
            None => Ok(default),
            Some(toml::Value::Float(v)) => Ok(*v),
            Some(toml::Value::Integer(v)) => Ok(*v as f64),
            Some(other) => Err(Error::Module(format!(
                "parameter '{name}' of module '{}' must be a number, got {}",
                self.id,
                other.type_str()
            ))),
        }
    }

    /// Read a required numeric parameter.
    ///
    /// # Errors
    /// Returns an error if the parameter is missing or not a number.
    pub fn require_f64(&self, name: &str) -> Result<f64> {
        if !self.params.contains_key(name) {
            return Err(Error::Module(format!(
                "module '{}' requires parameter '{name}'",
                self.id
            )));
        }
        self.param_f64(name, 0.0)
    }
}
