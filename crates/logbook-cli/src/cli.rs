use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "logbook")]
#[command(about = "Record student activities offline and sync them when the network returns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Base URL of the remote entries API
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Never contact the remote API; changes are queued
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new entry
    #[command(alias = "new")]
    Add {
        /// Student name
        name: String,
        /// Activity note
        #[arg(required = true)]
        activity: Vec<String>,
    },
    /// List entries newest-first
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry by id
    Delete {
        /// Entry id (negative for entries not yet synced)
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Reconcile with the remote and replay queued changes
    Sync,
    /// Show queued changes waiting for delivery
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the foreground until interrupted
    Watch {
        /// Seconds between connectivity probes and timer replays
        #[arg(long, default_value = "30", value_name = "SECS")]
        interval: u64,
    },
}
