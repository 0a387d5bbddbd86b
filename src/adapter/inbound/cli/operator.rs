//! Handlers for the audited operator overrides: `halt`, `resume` and
//! `liquidate`.

use serde_json::json;

use crate::adapter::inbound::cli::command::{HaltArgs, LiquidateArgs, ResumeArgs};
use crate::adapter::inbound::cli::output;
use crate::domain::AccountId;
use crate::error::{ConfigError, Result};
use crate::infrastructure::bootstrap::{self, Runtime};
use crate::infrastructure::config::Config;

fn configured_account(config: &Config, account: &str) -> Result<AccountId> {
    if config.accounts.iter().any(|a| a.id == account) {
        Ok(AccountId::from(account))
    } else {
        Err(ConfigError::InvalidValue {
            field: "account",
            reason: format!("'{account}' is not a configured account"),
        }
        .into())
    }
}

/// Execute the halt command.
pub async fn halt(config: &Config, args: &HaltArgs) -> Result<()> {
    let runtime = bootstrap::build(config)?;

    match &args.account {
        Some(account) => {
            let account_id = configured_account(config, account)?;
            let state = runtime.gate.halt(&account_id, &args.reason).await?;
            if output::is_json() {
                output::json_output(json!({
                    "command": "halt",
                    "account": account_id.to_string(),
                    "trading_enabled": state.trading_enabled,
                    "reason": state.halt_reason,
                }));
            } else {
                output::success(&format!("account {account_id} halted"));
                output::field("Reason", state.halt_reason.as_deref().unwrap_or(&args.reason));
            }
        }
        None => {
            let control = runtime.gate.halt_all(&args.reason).await?;
            if output::is_json() {
                output::json_output(json!({
                    "command": "halt",
                    "kill_switch": control.halted,
                    "reason": control.reason,
                }));
            } else {
                output::success("global kill switch engaged");
                output::field("Reason", &args.reason);
            }
        }
    }
    Ok(())
}

/// Execute the resume command.
pub async fn resume(config: &Config, args: &ResumeArgs) -> Result<()> {
    let runtime = bootstrap::build(config)?;

    if args.all {
        let control = runtime.gate.resume_all(&args.operator, &args.reason).await?;
        if output::is_json() {
            output::json_output(json!({
                "command": "resume",
                "kill_switch": control.halted,
                "operator": args.operator,
            }));
        } else {
            output::success("global kill switch released");
            output::field("Operator", &args.operator);
        }
        return Ok(());
    }

    let Some(account) = &args.account else {
        return Err(ConfigError::MissingField { field: "account" }.into());
    };
    let account_id = configured_account(config, account)?;
    let state = runtime
        .gate
        .resume(&account_id, &args.operator, &args.reason)
        .await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "resume",
            "account": account_id.to_string(),
            "trading_enabled": state.trading_enabled,
            "high_water_mark": state.high_water_mark,
            "operator": args.operator,
        }));
    } else {
        output::success(&format!("account {account_id} re-enabled"));
        output::field("Operator", &args.operator);
        output::field("High-water", state.high_water_mark.round_dp(2));
        output::note("high-water mark reset to current equity");
    }
    Ok(())
}

/// Execute the liquidate command.
pub async fn liquidate(config: &Config, args: &LiquidateArgs) -> Result<()> {
    let account_id = configured_account(config, &args.account)?;
    let runtime = bootstrap::build(config)?;
    liquidate_account(&runtime, &account_id).await
}

async fn liquidate_account(runtime: &Runtime, account_id: &AccountId) -> Result<()> {
    let broker = runtime.broker(account_id).ok_or_else(|| ConfigError::InvalidValue {
        field: "account",
        reason: format!("no broker for '{account_id}'"),
    })?;
    let report = runtime
        .gate
        .emergency_liquidate(account_id, broker.as_ref())
        .await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "liquidate",
            "account": account_id.to_string(),
            "orders_canceled": report.orders_canceled,
            "positions_closed": report.positions_closed,
            "halted": true,
        }));
    } else {
        output::success(&format!("account {account_id} liquidated and halted"));
        output::field("Canceled", report.orders_canceled);
        output::field("Closed", report.positions_closed);
        output::hint("resume with `warden resume --account <id> --operator <name> --reason <text>`");
    }
    Ok(())
}
