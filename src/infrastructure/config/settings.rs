//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets such as the Telegram bot
//! token and signing keys are only read from the environment.
//!
//! # Example
//!
//! ```no_run
//! use warden::infrastructure::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::account::AccountConfig;
use super::aggregator::AggregatorConfig;
use super::execution::ExecutionConfig;
use super::logging::LoggingConfig;
use super::market::MarketConfig;
use super::registry::RegistryConfig;
use super::risk::RiskConfig;
use super::telegram::TelegramAppConfig;
use crate::application::strategy::ModuleConfig;
use crate::domain::{AssetClass, Symbol};
use crate::error::{ConfigError, Result};

/// Persistence backend for ledger, risk state and performance history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// SQLite file at [`Config::database`].
    #[default]
    Sqlite,
    /// Process memory. Nothing survives a restart.
    Memory,
}

impl Storage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Path to SQLite database file.
    ///
    /// Defaults to "warden.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub storage: Storage,

    /// Seconds between supervisor cycles.
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub aggregator: AggregatorConfig,

    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Decision modules, discovered at startup.
    #[serde(default)]
    pub strategies: Vec<ModuleConfig>,

    /// Accounts, each with its own pipeline.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    #[serde(default)]
    pub market: MarketConfig,

    /// Telegram notification configuration.
    #[serde(default)]
    pub telegram: TelegramAppConfig,
}

fn default_database_path() -> String {
    "warden.db".to_string()
}

const fn default_cycle_interval_secs() -> u64 {
    60
}

fn invalid(field: &'static str, reason: impl Into<String>) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Parse and validate configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize logging from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Check ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.storage == Storage::Sqlite && self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        if self.cycle_interval_secs == 0 {
            return Err(invalid("cycle_interval_secs", "must be greater than 0"));
        }
        if self.registry.max_parallel == 0 {
            return Err(invalid("registry.max_parallel", "must be greater than 0"));
        }
        if self.registry.module_timeout_ms == 0 {
            return Err(invalid("registry.module_timeout_ms", "must be greater than 0"));
        }

        let aggregator = &self.aggregator;
        if aggregator.lookback == 0 {
            return Err(invalid("aggregator.lookback", "must be greater than 0"));
        }
        if aggregator.reference_capital <= Decimal::ZERO {
            return Err(invalid("aggregator.reference_capital", "must be greater than 0"));
        }
        if !(aggregator.periods_per_year.is_finite() && aggregator.periods_per_year > 0.0) {
            return Err(invalid("aggregator.periods_per_year", "must be greater than 0"));
        }
        if aggregator.reduced_sharpe > aggregator.active_sharpe {
            return Err(invalid(
                "aggregator.reduced_sharpe",
                "must not exceed active_sharpe",
            ));
        }
        if aggregator.systemic_sell_threshold == 0 {
            return Err(invalid(
                "aggregator.systemic_sell_threshold",
                "must be at least 1",
            ));
        }
        if aggregator.signer_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "aggregator.signer_id",
            }
            .into());
        }

        let risk = &self.risk;
        if risk.max_drawdown_pct <= Decimal::ZERO || risk.max_drawdown_pct >= Decimal::ONE {
            return Err(invalid("risk.max_drawdown_pct", "must be between 0 and 1"));
        }
        if risk.max_concentration_pct <= Decimal::ZERO || risk.max_concentration_pct > Decimal::ONE {
            return Err(invalid("risk.max_concentration_pct", "must be in (0, 1]"));
        }
        if risk.max_position_quantity <= Decimal::ZERO {
            return Err(invalid("risk.max_position_quantity", "must be greater than 0"));
        }
        if risk.trade_period_secs == 0 || risk.state_timeout_ms == 0 {
            return Err(invalid("risk", "periods and timeouts must be greater than 0"));
        }

        let execution = &self.execution;
        if execution.max_spread_pct < Decimal::ZERO || execution.max_spread_pct > Decimal::ONE {
            return Err(invalid("execution.max_spread_pct", "must be between 0 and 1"));
        }
        if execution.limit_buffer_pct < Decimal::ZERO || execution.limit_buffer_pct >= Decimal::ONE {
            return Err(invalid("execution.limit_buffer_pct", "must be in [0, 1)"));
        }
        if execution.broker_timeout_ms == 0 {
            return Err(invalid("execution.broker_timeout_ms", "must be greater than 0"));
        }

        for strategy in &self.strategies {
            if strategy.allocation < Decimal::ZERO || strategy.allocation > Decimal::ONE {
                return Err(invalid(
                    "strategies.allocation",
                    format!("module '{}': must be between 0 and 1", strategy.id),
                ));
            }
        }

        if self.accounts.is_empty() {
            return Err(ConfigError::MissingField { field: "accounts" }.into());
        }
        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.id.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "accounts.id",
                }
                .into());
            }
            if !seen.insert(account.id.as_str()) {
                return Err(invalid(
                    "accounts.id",
                    format!("duplicate account '{}'", account.id),
                ));
            }
            if account.starting_cash < Decimal::ZERO {
                return Err(invalid(
                    "accounts.starting_cash",
                    format!("account '{}': must be 0 or greater", account.id),
                ));
            }
        }

        for quote in &self.market.quotes {
            if quote.bid <= Decimal::ZERO || quote.ask < quote.bid {
                return Err(invalid(
                    "market.quotes",
                    format!("{}: need 0 < bid <= ask", quote.symbol),
                ));
            }
        }

        Ok(())
    }

    /// Symbols and asset classes traded by `account`.
    ///
    /// Explicit account symbols win; otherwise every enabled strategy symbol
    /// is traded. Asset classes come from the quote config, then from the
    /// strategy config.
    #[must_use]
    pub fn universe(&self, account: &AccountConfig) -> Vec<(Symbol, AssetClass)> {
        let mut symbols: Vec<String> = if account.symbols.is_empty() {
            self.strategies
                .iter()
                .filter(|s| s.enabled)
                .map(|s| s.symbol.clone())
                .collect()
        } else {
            account.symbols.clone()
        };
        symbols.sort();
        symbols.dedup();

        symbols
            .into_iter()
            .map(|symbol| {
                let asset_class = self
                    .market
                    .asset_class(&symbol)
                    .or_else(|| {
                        self.strategies
                            .iter()
                            .find(|s| s.symbol == symbol)
                            .map(|s| s.asset_class)
                    })
                    .unwrap_or_default();
                (Symbol::from(symbol), asset_class)
            })
            .collect()
    }
}
