//! Planmatch CLI
//!
//! Health plan recommendations from plan documents.

use clap::Parser;
use planmatch_core::error::exit_codes;
use planmatch_core::{Config, PlanMatchError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Recommend(args) => {
            let config = match cli.config {
                Some(ref path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            commands::recommend::run(args, &config, cli.format, cli.verbose).await
        }
        Commands::Prices(args) => commands::prices::run(args, cli.format),
        Commands::Band(args) => commands::band::run(args, cli.format),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<PlanMatchError>()
            .map(PlanMatchError::exit_code)
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}
