//! Handler for the `status` command.

use rust_decimal::Decimal;
use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::output;
use crate::domain::{LedgerStatus, RiskState};
use crate::error::Result;
use crate::infrastructure::bootstrap::Stores;
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct RiskRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Trading")]
    trading: String,
    #[tabled(rename = "Equity")]
    equity: String,
    #[tabled(rename = "High-water")]
    high_water_mark: String,
    #[tabled(rename = "Drawdown")]
    drawdown: String,
    #[tabled(rename = "Trades")]
    trades: u32,
    #[tabled(rename = "Halt reason")]
    reason: String,
}

impl From<&RiskState> for RiskRow {
    fn from(state: &RiskState) -> Self {
        Self {
            account: state.account_id.to_string(),
            trading: if state.trading_enabled {
                output::positive("enabled")
            } else {
                output::negative("halted")
            },
            equity: state.current_equity.round_dp(2).to_string(),
            high_water_mark: state.high_water_mark.round_dp(2).to_string(),
            drawdown: format!("{}%", (state.drawdown_pct * Decimal::ONE_HUNDRED).round_dp(2)),
            trades: state.trades_in_period,
            reason: state.halt_reason.clone().unwrap_or_default(),
        }
    }
}

/// Execute the status command.
pub async fn execute(config: &Config) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }

    let stores = Stores::open(config)?;
    let control = stores.risk.load_control().await?;
    let states = stores.risk.list().await?;
    let pending = stores.ledger.by_status(LedgerStatus::Pending).await?;
    let submitted = stores.ledger.by_status(LedgerStatus::Submitted).await?;
    let failed = stores.ledger.by_status(LedgerStatus::Failed).await?;

    if output::is_json() {
        let accounts: Vec<_> = states
            .iter()
            .map(|state| {
                json!({
                    "account": state.account_id.to_string(),
                    "trading_enabled": state.trading_enabled,
                    "current_equity": state.current_equity,
                    "high_water_mark": state.high_water_mark,
                    "drawdown_pct": state.drawdown_pct,
                    "trades_in_period": state.trades_in_period,
                    "halt_reason": state.halt_reason,
                    "version": state.version,
                })
            })
            .collect();
        output::json_output(json!({
            "command": "status",
            "kill_switch": {
                "halted": control.halted,
                "reason": control.reason,
            },
            "accounts": accounts,
            "ledger": {
                "pending": pending.len(),
                "submitted": submitted.len(),
                "failed": failed.len(),
            },
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    if control.halted {
        output::field(
            "Kill switch",
            output::negative(format!(
                "engaged ({})",
                control.reason.as_deref().unwrap_or("no reason given")
            )),
        );
    } else {
        output::field("Kill switch", output::positive("released"));
    }

    output::section("Accounts");
    if states.is_empty() {
        output::note("no risk state recorded yet");
        output::hint("run `warden run --once` to evaluate every account");
    } else {
        let rows: Vec<RiskRow> = states.iter().map(RiskRow::from).collect();
        output::lines(&Table::new(rows).to_string());
    }

    output::section("Ledger");
    output::field("Pending", output::highlight(pending.len()));
    output::field("Submitted", submitted.len());
    output::field("Failed", failed.len());
    if !pending.is_empty() {
        output::hint("run `warden reconcile` to resolve pending intents");
    }
    Ok(())
}
