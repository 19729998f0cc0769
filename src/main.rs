//! Convoy CLI entry point.

use clap::Parser;

use convoy::cli::{handle_error, Cli, Commands};
use convoy::infrastructure::config::ConfigLoader;
use convoy::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // An invalid config is reported by the command itself; log with defaults meanwhile.
    let log_config = ConfigLoader::load()
        .ok()
        .and_then(|config| LogConfig::try_from(&config.logging).ok())
        .unwrap_or_default();
    let _logger = match LoggerImpl::init(&log_config) {
        Ok(logger) => Some(logger),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let result = match cli.command {
        Commands::Route(args) => convoy::cli::commands::route::execute(args, cli.json).await,
        Commands::Simulate(args) => convoy::cli::commands::simulate::execute(args, cli.json).await,
        Commands::Config(args) => convoy::cli::commands::config::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
