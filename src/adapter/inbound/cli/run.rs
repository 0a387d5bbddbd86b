//! Handler for the `run` command.

use std::time::Duration;

use serde_json::json;
use tabled::{Table, Tabled};
use tracing::info;

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::output;
use crate::application::pipeline::AccountOutcome;
use crate::error::Result;
use crate::infrastructure::bootstrap::{self, Runtime};
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Signals")]
    signals: usize,
    #[tabled(rename = "Decisions")]
    decisions: usize,
    #[tabled(rename = "Placed")]
    placed: usize,
    #[tabled(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&AccountOutcome> for OutcomeRow {
    fn from(outcome: &AccountOutcome) -> Self {
        let account = outcome.account_id.to_string();
        match &outcome.result {
            Ok(report) => Self {
                account,
                signals: report.signals,
                decisions: report.decisions,
                placed: report.placed(),
                skipped: report.skipped.len(),
                result: match &report.halted {
                    Some(reason) => format!("halted: {reason}"),
                    None if report.systemic_override => "ok (systemic override)".into(),
                    None => "ok".into(),
                },
            },
            Err(reason) => Self {
                account,
                signals: 0,
                decisions: 0,
                placed: 0,
                skipped: 0,
                result: format!("failed: {reason}"),
            },
        }
    }
}

/// Execute the run command.
pub async fn execute(config: &Config, args: &RunArgs) -> Result<()> {
    let runtime = bootstrap::build(config)?;
    print_startup(config, &runtime);

    if args.once {
        let outcomes = runtime.supervisor.run_once().await;
        print_outcomes(&outcomes);
        return Ok(());
    }

    let interval = Duration::from_secs(config.cycle_interval_secs);
    runtime
        .supervisor
        .run(interval, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    info!("warden stopped");
    Ok(())
}

fn print_startup(config: &Config, runtime: &Runtime) {
    if output::is_json() {
        return;
    }
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Accounts", runtime.brokers.len());
    output::field(
        "Modules",
        runtime
            .discovery
            .loaded
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    );
    output::field("Storage", config.storage.as_str());
    for skipped in &runtime.discovery.skipped {
        output::warning(&format!("module {} skipped: {}", skipped.id, skipped.reason));
    }
    if runtime.discovery.loaded.is_empty() {
        output::hint("no decision modules loaded; every cycle will produce HOLD");
    }
}

fn print_outcomes(outcomes: &[AccountOutcome]) {
    let rows: Vec<OutcomeRow> = outcomes.iter().map(OutcomeRow::from).collect();

    if output::is_json() {
        let accounts: Vec<_> = rows
            .iter()
            .map(|row| {
                json!({
                    "account": row.account,
                    "signals": row.signals,
                    "decisions": row.decisions,
                    "placed": row.placed,
                    "skipped": row.skipped,
                    "result": row.result,
                })
            })
            .collect();
        output::json_output(json!({ "command": "run", "accounts": accounts }));
        return;
    }

    output::section("Cycle");
    output::lines(&Table::new(rows).to_string());

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed == 0 {
        output::success("cycle finished");
    } else {
        output::warning(&format!("{failed} account(s) failed"));
    }
}
