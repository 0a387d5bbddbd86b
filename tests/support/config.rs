use std::path::PathBuf;

use tempfile::TempDir;

/// A small but complete configuration: one account, two modules, quotes
/// for both symbols.
pub fn sample_toml(storage: &str, database: &str) -> String {
    format!(
        r#"
storage = "{storage}"
database = "{database}"
cycle_interval_secs = 5

[logging]
level = "warn"

[risk]
max_drawdown_pct = "0.05"

[[accounts]]
id = "paper-1"
starting_cash = "100000"

[[strategies]]
id = "regime"
kind = "regime_bias"
symbol = "SPY"
allocation = "0.1"

[[strategies]]
id = "fade"
kind = "spread_reversion"
symbol = "AAPL"
allocation = "0.05"
params = {{ fair_value = 100.0 }}

[[market.quotes]]
symbol = "SPY"
bid = "449.95"
ask = "450.05"

[[market.quotes]]
symbol = "AAPL"
bid = "99.99"
ask = "100.01"
"#
    )
}

/// Write `contents` as `config.toml` in a fresh temp directory.
pub fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).expect("write config");
    (dir, path)
}

/// Sample configuration on SQLite inside the temp directory.
pub fn sqlite_config() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let database = dir.path().join("warden.db");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, sample_toml("sqlite", &database.to_string_lossy()))
        .expect("write config");
    (dir, path)
}
