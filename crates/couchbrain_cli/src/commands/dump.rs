//! Dump command implementation.

use super::load;
use crate::error::CliError;
use couchbrain_engine::{BrainHost, SyncConfig};

/// Runs the dump command.
pub async fn run(config: SyncConfig) -> Result<(), CliError> {
    let (_engine, brain, _report) = load(config).await?;
    println!("{}", serde_json::to_string_pretty(&brain.snapshot())?);
    Ok(())
}
