//! Handler for the `reconcile` command.

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::Config;

/// Execute the reconcile command.
pub async fn execute(config: &Config) -> Result<()> {
    let runtime = bootstrap::build(config)?;
    let reports = runtime.supervisor.reconcile_all().await;

    if output::is_json() {
        let accounts: Vec<_> = reports
            .iter()
            .map(|(account_id, report)| match report {
                Ok(report) => json!({
                    "account": account_id.to_string(),
                    "examined": report.examined,
                    "submitted": report.submitted,
                    "failed": report.failed,
                    "unresolved": report.unresolved,
                }),
                Err(error) => json!({
                    "account": account_id.to_string(),
                    "error": error,
                }),
            })
            .collect();
        output::json_output(json!({ "command": "reconcile", "accounts": accounts }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    for (account_id, report) in &reports {
        output::section(&account_id.to_string());
        match report {
            Ok(report) => {
                output::field("Examined", report.examined);
                output::field("Submitted", report.submitted);
                output::field("Failed", report.failed);
                if report.unresolved > 0 {
                    output::warning(&format!(
                        "{} intent(s) left PENDING, broker unreachable",
                        report.unresolved
                    ));
                }
            }
            Err(error) => output::error(error),
        }
    }
    Ok(())
}
