//! Run command implementation.

use crate::client::connect;
use crate::error::CliError;
use crate::host::FileBrain;
use couchbrain_engine::{AutoSave, BrainSync, SyncConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Runs the run command.
pub async fn run(config: SyncConfig, file: &Path) -> Result<(), CliError> {
    let host = Arc::new(FileBrain::open(file)?);
    let store = connect(&config.store)?;
    let engine = Arc::new(BrainSync::new(config, store));

    engine.load(host.as_ref()).await?;
    info!(
        file = %host.path().display(),
        interval = ?engine.config().save_interval,
        "keeping brain in sync; press Ctrl-C to stop"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
        }
    };
    let cycles = AutoSave::new(Arc::clone(&engine), host).run_until(shutdown).await;

    let stats = engine.stats();
    info!(
        cycles,
        written = stats.documents_written,
        deleted = stats.documents_deleted,
        rejections = stats.rejections,
        failed = stats.failed_cycles,
        "stopped"
    );
    Ok(())
}
