//! dbadmin-config CLI entry point.

use clap::Parser;

use dbadmin_config::cli::commands::{check, secret, show, watch};
use dbadmin_config::cli::{handle_error, Cli, Commands};
use dbadmin_config::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _logger = match LoggerImpl::init(&cli.log_config()) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Check(args) => check::execute(args, &cli.config, cli.json),
        Commands::Show(args) => show::execute(args, &cli.config, cli.json),
        Commands::Secret(args) => secret::execute(args, cli.json),
        Commands::Watch(args) => watch::execute(args, &cli.config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
