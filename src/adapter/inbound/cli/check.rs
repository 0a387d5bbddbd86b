//! Handler for the `check` command.

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::application::strategy::StrategyRegistry;
use crate::error::Result;
use crate::infrastructure::bootstrap::Stores;
use crate::infrastructure::config::{Config, Storage};

/// Execute the check command.
///
/// The configuration has already been parsed and validated by the time this
/// runs; this reports what a `run` would wire up.
pub async fn execute(config: &Config) -> Result<()> {
    let mut registry = StrategyRegistry::with_builtin(
        config.registry.max_parallel,
        config.registry.module_timeout(),
    );
    let report = registry.discover(&config.strategies);

    if config.storage == Storage::Sqlite {
        Stores::open(config)?;
    }

    let universes: Vec<_> = config
        .accounts
        .iter()
        .map(|account| {
            let symbols: Vec<String> = config
                .universe(account)
                .into_iter()
                .map(|(symbol, _)| symbol.to_string())
                .collect();
            (account.id.clone(), symbols)
        })
        .collect();

    if output::is_json() {
        output::json_output(json!({
            "command": "check",
            "valid": true,
            "storage": config.storage.as_str(),
            "accounts": universes
                .iter()
                .map(|(id, symbols)| json!({ "id": id, "symbols": symbols }))
                .collect::<Vec<_>>(),
            "modules": report.loaded.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "skipped": report
                .skipped
                .iter()
                .map(|s| json!({ "id": s.id, "reason": s.reason }))
                .collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::success("configuration is valid");
    output::field("Storage", config.storage.as_str());
    if config.storage == Storage::Sqlite {
        output::field("Database", &config.database);
    }

    output::section("Accounts");
    for (id, symbols) in &universes {
        if symbols.is_empty() {
            output::warning(&format!("{id}: empty universe, nothing will trade"));
        } else {
            output::field(id, symbols.join(", "));
        }
    }

    output::section("Modules");
    for id in &report.loaded {
        output::success(&id.to_string());
    }
    for skipped in &report.skipped {
        output::warning(&format!("{} skipped: {}", skipped.id, skipped.reason));
    }
    if report.loaded.is_empty() {
        output::hint("add a [[strategies]] entry with a known kind");
    }
    Ok(())
}
