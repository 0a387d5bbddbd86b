//! CLI module graph.

pub mod check;
pub mod command;
pub mod operator;
pub mod output;
pub mod reconcile;
pub mod run;
pub mod status;

use crate::error::Result;
use crate::infrastructure::config::Config;
use command::Commands;

/// Path of the configuration file a command reads.
#[must_use]
pub fn config_path(command: &Commands) -> &std::path::Path {
    match command {
        Commands::Run(args) => &args.config.config,
        Commands::Status(arg) | Commands::Reconcile(arg) | Commands::Check(arg) => &arg.config,
        Commands::Liquidate(args) => &args.config.config,
        Commands::Halt(args) => &args.config.config,
        Commands::Resume(args) => &args.config.config,
    }
}

/// Dispatch a parsed command against a loaded configuration.
pub async fn dispatch(command: &Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run(args) => run::execute(config, args).await,
        Commands::Status(_) => status::execute(config).await,
        Commands::Reconcile(_) => reconcile::execute(config).await,
        Commands::Liquidate(args) => operator::liquidate(config, args).await,
        Commands::Halt(args) => operator::halt(config, args).await,
        Commands::Resume(args) => operator::resume(config, args).await,
        Commands::Check(_) => check::execute(config).await,
    }
}
