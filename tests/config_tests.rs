mod support;

use rust_decimal_macros::dec;
use support::config::{sample_toml, write_config};
use warden::domain::{AssetClass, Symbol};
use warden::error::{ConfigError, Error};
use warden::infrastructure::config::{Config, Storage};

#[test]
fn sample_config_loads_from_disk() {
    let (_dir, path) = write_config(&sample_toml("memory", "unused.db"));
    let config = Config::load(&path).unwrap();

    assert_eq!(config.storage, Storage::Memory);
    assert_eq!(config.cycle_interval_secs, 5);
    assert_eq!(config.accounts.len(), 1);
    assert_eq!(config.accounts[0].starting_cash, dec!(100000));
    assert_eq!(config.strategies.len(), 2);
    assert_eq!(config.strategies[1].require_f64("fair_value").unwrap(), 100.0);
    assert_eq!(config.risk.max_drawdown_pct, dec!(0.05));
    assert_eq!(config.market.quotes.len(), 2);
}

#[test]
fn universe_covers_every_strategy_symbol() {
    let config = Config::parse_toml(&sample_toml("memory", "unused.db")).unwrap();
    let universe = config.universe(&config.accounts[0]);

    assert_eq!(
        universe,
        vec![
            (Symbol::from("AAPL"), AssetClass::Equity),
            (Symbol::from("SPY"), AssetClass::Equity),
        ]
    );
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load("/nonexistent/warden.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = Config::parse_toml("accounts = [").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn drawdown_limit_must_be_a_fraction() {
    let toml = sample_toml("memory", "unused.db").replace(
        "max_drawdown_pct = \"0.05\"",
        "max_drawdown_pct = \"5\"",
    );
    let err = Config::parse_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("risk.max_drawdown_pct"));
}

#[test]
fn crossed_quote_is_rejected() {
    let toml = sample_toml("memory", "unused.db").replace("ask = \"100.01\"", "ask = \"99.00\"");
    let err = Config::parse_toml(&toml).unwrap_err();
    assert!(err.to_string().contains("market.quotes"));
}

#[test]
fn config_without_accounts_is_rejected() {
    let err = Config::parse_toml("storage = \"memory\"").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingField { field: "accounts" })
    ));
}
