//! Inspect command implementation.

use super::load;
use crate::error::CliError;
use couchbrain_engine::{LoadReport, SyncConfig};
use serde::Serialize;

/// Brain inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store endpoint.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Rows listed, tombstones included.
    pub records: u64,
    /// Keys holding a value.
    pub values: usize,
    /// Deleted documents still listed by the store.
    pub tombstones: usize,
    /// Pages fetched.
    pub pages: u64,
    /// Load time in milliseconds.
    pub load_ms: u128,
}

impl InspectResult {
    fn new(config: &SyncConfig, report: &LoadReport) -> Self {
        let page_size = u64::from(config.page_size.max(1));
        Self {
            url: config.store.url.clone(),
            database: config.store.database.clone(),
            records: report.records,
            values: report.values,
            tombstones: report.tombstones,
            pages: report.records.div_ceil(page_size).max(1),
            load_ms: report.duration.as_millis(),
        }
    }
}

/// Runs the inspect command.
pub async fn run(config: SyncConfig, format: &str) -> Result<(), CliError> {
    let (engine, _brain, report) = load(config).await?;
    let result = InspectResult::new(engine.config(), &report);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("couchbrain Inspection");
    println!("=====================");
    println!();
    println!("Store:    {}", result.url);
    println!("Database: {}", result.database);
    println!();
    println!("Records:");
    println!("  Listed:     {}", result.records);
    println!("  Values:     {}", result.values);
    println!("  Tombstones: {}", result.tombstones);
    println!();
    println!("Loaded in {} ms over {} pages", result.load_ms, result.pages);
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchbrain_engine::StoreConfig;
    use std::time::Duration;

    fn report(records: u64) -> LoadReport {
        LoadReport {
            records,
            values: 1,
            tombstones: 0,
            duration: Duration::from_millis(12),
        }
    }

    #[test]
    fn page_count() {
        let config = SyncConfig::new(StoreConfig::new("https://a.example.com", "hubot"));
        assert_eq!(InspectResult::new(&config, &report(0)).pages, 1);
        assert_eq!(InspectResult::new(&config, &report(99)).pages, 1);
        assert_eq!(InspectResult::new(&config, &report(100)).pages, 1);
        assert_eq!(InspectResult::new(&config, &report(250)).pages, 3);
    }
}
