use clap::Parser;
use tracing::{error, info};

use warden::adapter::inbound::cli::command::{Cli, ColorChoice};
use warden::adapter::inbound::cli::output::{self, OutputConfig};
use warden::adapter::inbound::cli::{config_path, dispatch};
use warden::infrastructure::config::Config;

fn apply_color(choice: &ColorChoice) {
    match choice {
        ColorChoice::Auto => {}
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    apply_color(&cli.color);
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let path = config_path(&cli.command);
    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("failed to load {}: {e}", path.display()));
            std::process::exit(2);
        }
    };

    config.init_logging();
    info!("warden starting");

    if let Err(e) = dispatch(&cli.command, &config).await {
        error!(error = %e, "Command failed");
        output::error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}
