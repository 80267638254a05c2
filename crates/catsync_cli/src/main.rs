//! catsync CLI
//!
//! Command-line driver for mirroring local catalog categories into remote
//! product sets.
//!
//! # Commands
//!
//! - `sync-all` - Reconcile every local entity (or print the plan)
//! - `event` - Reconcile a single lifecycle event
//! - `payload` - Print the wire payload for an entity
//! - `mappings` - List stored local-to-remote mappings
//! - `cleanup` - Delete remote resources whose local entity is gone

mod commands;
mod entities;
mod transport;

use catsync_protocol::{ChangeKind, SyncDomain};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog reconciliation tools.
#[derive(Parser)]
#[command(name = "catsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding the local entities
    #[arg(global = true, short, long)]
    entities: Option<PathBuf>,

    /// Directory holding the mapping stores
    #[arg(global = true, short, long, default_value = ".catsync")]
    state_dir: PathBuf,

    /// Sync domain
    #[arg(global = true, short, long, default_value = SyncDomain::PRODUCT_SETS)]
    domain: String,

    /// Treat the domain as disabled
    #[arg(global = true, long)]
    sync_disabled: bool,

    /// Remote catalog ID
    #[arg(global = true, long, env = "CATSYNC_CATALOG_ID")]
    catalog_id: Option<String>,

    /// Remote API access token
    #[arg(global = true, long, env = "CATSYNC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Remote API base URL
    #[arg(global = true, long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every local entity
    SyncAll {
        /// Print the planned operations without calling the remote
        #[arg(long)]
        dry_run: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Reconcile a single lifecycle event
    Event {
        /// Event kind (created, updated, deleted)
        #[arg(short, long)]
        kind: ChangeKind,

        /// Local entity ID
        #[arg(short, long)]
        id: String,
    },

    /// Print the wire payload for an entity
    Payload {
        /// Local entity ID
        #[arg(short, long)]
        id: String,
    },

    /// List stored mappings
    Mappings {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Delete remote resources whose local entity no longer exists
    Cleanup,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = commands::Settings {
        entities: cli.entities,
        state_dir: cli.state_dir,
        domain: SyncDomain::new(cli.domain),
        sync_enabled: !cli.sync_disabled,
        catalog_id: cli.catalog_id,
        access_token: cli.access_token,
        base_url: cli.base_url,
        timeout: std::time::Duration::from_secs(cli.timeout),
    };

    match cli.command {
        Commands::SyncAll { dry_run, format } => {
            commands::sync_all::run(&settings, dry_run, &format)?;
        }
        Commands::Event { kind, id } => {
            commands::event::run(&settings, kind, &id)?;
        }
        Commands::Payload { id } => {
            commands::payload::run(&settings, &id)?;
        }
        Commands::Mappings { format } => {
            commands::mappings::run(&settings, &format)?;
        }
        Commands::Cleanup => {
            commands::cleanup::run(&settings)?;
        }
        Commands::Version => {
            println!("catsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
