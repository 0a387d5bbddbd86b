//! Command-line interface definitions.
//!
//! Defines the CLI structure for the warden application using `clap`.
//! Subcommands cover the trading loop, read-only inspection, and the
//! audited operator overrides (halt, resume, liquidate).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Multi-strategy signal orchestration with a fail-closed risk gate
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the warden CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the trading cycle for every configured account
    Run(RunArgs),

    /// Show risk state, kill switch and ledger summary
    Status(ConfigPathArg),

    /// Resolve stale PENDING ledger entries against the broker
    Reconcile(ConfigPathArg),

    /// Cancel all orders, close all positions and halt an account
    Liquidate(LiquidateArgs),

    /// Halt one account, or engage the global kill switch
    Halt(HaltArgs),

    /// Re-enable a halted account, or release the global kill switch
    Resume(ResumeArgs),

    /// Validate the configuration and strategy discovery
    Check(ConfigPathArg),
}

/// Shared argument struct for commands that require only a configuration path.
#[derive(Args, Debug, Clone)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Run a single reconcile-and-cycle pass, then exit.
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `liquidate` subcommand.
#[derive(Args, Debug)]
pub struct LiquidateArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Account to liquidate.
    #[arg(long)]
    pub account: String,
}

/// Arguments for the `halt` subcommand.
///
/// Without `--account` the global kill switch is engaged.
#[derive(Args, Debug)]
pub struct HaltArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Account to halt.
    #[arg(long)]
    pub account: Option<String>,

    /// Reason recorded in the audit log.
    #[arg(long)]
    pub reason: String,
}

/// Arguments for the `resume` subcommand.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Account to re-enable.
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    pub account: Option<String>,

    /// Release the global kill switch instead of one account.
    #[arg(long)]
    pub all: bool,

    /// Operator performing the override.
    #[arg(long)]
    pub operator: String,

    /// Reason recorded in the audit log.
    #[arg(long)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resume_requires_account_or_all() {
        let missing = Cli::try_parse_from(["warden", "resume", "--operator", "op", "--reason", "r"]);
        assert!(missing.is_err());

        let both = Cli::try_parse_from([
            "warden", "resume", "--account", "a", "--all", "--operator", "op", "--reason", "r",
        ]);
        assert!(both.is_err());

        let cli = Cli::try_parse_from([
            "warden", "resume", "--all", "--operator", "op", "--reason", "r",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Resume(ResumeArgs { all: true, .. })));
    }

    #[test]
    fn halt_without_account_targets_everything() {
        let cli = Cli::try_parse_from(["warden", "--json", "halt", "--reason", "maintenance"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Halt(args) => {
                assert!(args.account.is_none());
                assert_eq!(args.config.config, PathBuf::from("config.toml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
