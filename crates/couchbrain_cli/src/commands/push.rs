//! Push command implementation.

use super::load;
use crate::error::CliError;
use crate::host::read_brain;
use couchbrain_engine::{SaveReport, SyncConfig};
use std::path::Path;
use tracing::info;

/// Runs the push command.
pub async fn run(config: SyncConfig, file: &Path) -> Result<(), CliError> {
    let desired = read_brain(file)?;
    let (engine, brain, _report) = load(config).await?;

    info!(keys = desired.len(), "pushing {}", file.display());
    brain.replace(desired);
    let report = engine.save_with(&brain).await?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &SaveReport) {
    if report.is_noop() {
        println!("Nothing to save");
        return;
    }
    println!("Submitted: {}", report.submitted);
    println!("Written:   {}", report.written);
    println!("Deleted:   {}", report.deleted);
    if !report.rejected.is_empty() {
        println!("Rejected:  {}", report.rejected.len());
        for rejection in &report.rejected {
            println!(
                "  {}: {} {}",
                rejection.key,
                rejection.error.as_deref().unwrap_or("unknown"),
                rejection.reason.as_deref().unwrap_or("")
            );
        }
    }
}
