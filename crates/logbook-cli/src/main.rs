//! Logbook CLI - record student activities from the terminal
//!
//! Entries are stored locally first and delivered to the remote API when it
//! is reachable.

mod cli;
mod commands;
mod config;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::pending::run_pending;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::config::Settings;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logbook=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Commands::Add { name, activity } => run_add(&name, &activity, &settings).await?,
        Commands::List { limit, json } => run_list(limit, json, &settings).await?,
        Commands::Delete { id } => run_delete(id, &settings).await?,
        Commands::Sync => run_sync(&settings).await?,
        Commands::Pending { json } => run_pending(json, &settings).await?,
        Commands::Watch { interval } => run_watch(interval, &settings).await?,
    }

    Ok(())
}
