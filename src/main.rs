mod api;
mod application;
mod config;
mod domain;
mod logging;
mod ui;
mod utils;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use crate::api::ApiClient;
use crate::application::DownloadCoordinator;
use crate::config::{AppConfig, Cli, Commands};
use crate::domain::Outcome;
use crate::ui::Screen;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli)?;
    let _log_guard = logging::init_logging(&config.log);

    let Commands::List { package } = cli.command;
    let listing_url = config.api.listing_url(&package);
    info!(%package, %listing_url, "starting");
    println!("Fetching files of {} from {}", package, listing_url);

    let client = ApiClient::new(config.api.clone()).context("failed to build HTTP client")?;
    let mut screen = Screen::stdout().context("failed to open terminal")?;
    let coordinator = DownloadCoordinator::new(client.clone(), client, config.download);

    let outcome = coordinator.run(&package, &mut screen).await;
    drop(screen);
    info!(success = outcome.is_success(), "run finished");

    match outcome {
        Outcome::Success { final_path } => {
            println!("{}", final_path.display());
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failure { reason } => {
            eprintln!("Error: {}", reason);
            Ok(ExitCode::FAILURE)
        }
    }
}
