//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod push;
pub mod run;

use crate::client::{connect, ReqwestClient};
use crate::error::CliError;
use couchbrain_engine::{BrainSync, HttpStore, LoadReport, MemoryBrain, SyncConfig};

/// An engine talking HTTP.
pub type HttpEngine = BrainSync<HttpStore<ReqwestClient>>;

/// Connects and bootstraps into a fresh in-memory brain.
pub async fn load(config: SyncConfig) -> Result<(HttpEngine, MemoryBrain, LoadReport), CliError> {
    let store = connect(&config.store)?;
    let engine = BrainSync::new(config, store);
    let brain = MemoryBrain::new();
    let report = engine.load(&brain).await?;
    Ok((engine, brain, report))
}
