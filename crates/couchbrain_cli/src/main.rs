//! couchbrain CLI
//!
//! Command-line tools for a brain persisted in a CouchDB-compatible store.
//!
//! # Commands
//!
//! - `inspect` - Load the brain and report record counts
//! - `dump` - Load the brain and print it as JSON
//! - `push` - Save a JSON file as the brain's desired state
//! - `run` - Keep a JSON file in step with the store until interrupted

mod client;
mod commands;
mod error;
mod host;

use clap::{Parser, Subcommand};
use couchbrain_engine::{StoreConfig, SyncConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// couchbrain command-line tools.
#[derive(Parser)]
#[command(name = "couchbrain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store endpoint; a trailing path segment names the database
    #[arg(global = true, short, long)]
    url: Option<String>,

    /// Database name
    #[arg(global = true, short, long)]
    db: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the brain and report record counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load the brain and print it as JSON
    Dump,

    /// Save a JSON object as the desired state; absent keys are deleted
    Push {
        /// JSON file holding the desired brain
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Keep a JSON file in step with the store until Ctrl-C
    Run {
        /// JSON file holding the brain
        #[arg(short, long)]
        file: PathBuf,

        /// Seconds between saves
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show version information
    Version,
}

/// Resolves the store location from flags, falling back to the environment.
fn store_config(url: Option<String>, db: Option<String>) -> Result<StoreConfig, error::CliError> {
    let mut config = match url {
        Some(url) => StoreConfig::from_url(&url),
        None => StoreConfig::from_env()?,
    };
    if let Some(db) = db {
        config.database = db;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("couchbrain CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = SyncConfig::new(store_config(cli.url, cli.db)?);

    match cli.command {
        Commands::Inspect { format } => commands::inspect::run(config, &format).await?,
        Commands::Dump => commands::dump::run(config).await?,
        Commands::Push { file } => commands::push::run(config, &file).await?,
        Commands::Run { file, interval } => {
            let config = match interval {
                Some(secs) => config.with_save_interval(Duration::from_secs(secs.max(1))),
                None => config,
            };
            commands::run::run(config, &file).await?
        }
        Commands::Version => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_flag_honours_legacy_syntax() {
        let config = store_config(Some("https://acct.example.com/brains".into()), None).unwrap();
        assert_eq!(config.url, "https://acct.example.com");
        assert_eq!(config.database, "brains");
    }

    #[test]
    fn db_flag_wins() {
        let config = store_config(
            Some("https://acct.example.com/brains".into()),
            Some("other".into()),
        )
        .unwrap();
        assert_eq!(config.database, "other");
    }

    #[test]
    fn parses_run_command() {
        let cli = Cli::try_parse_from([
            "couchbrain",
            "--url",
            "http://localhost:5984",
            "run",
            "--file",
            "brain.json",
            "--interval",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.url.as_deref(), Some("http://localhost:5984"));
        match cli.command {
            Commands::Run { file, interval } => {
                assert_eq!(file, PathBuf::from("brain.json"));
                assert_eq!(interval, Some(10));
            }
            _ => panic!("expected run"),
        }
    }
}
