//! reshuffle CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use reshuffle_core::init_tracing;

use reshuffle_client::cli::{Cli, Command, ConfigAction};
use reshuffle_client::commands;
use reshuffle_client::config::ClientConfig;
use reshuffle_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let debug = cli.debug || config.debug;
    if let Err(e) = init_tracing(config.tracing_config(debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config, debug).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::RunFailed) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
}

async fn run(cli: Cli, config: ClientConfig, debug: bool) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        None => commands::run::run(&cli.run, &config, debug).await,
    }
}
