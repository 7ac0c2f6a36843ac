//! A brain backed by a JSON file.

use crate::error::CliError;
use couchbrain_engine::{BrainEvent, BrainHost};
use couchbrain_protocol::BrainData;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

/// Reads a JSON object from `path` as brain data.
pub fn read_brain(path: &Path) -> Result<BrainData, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(BrainData::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| CliError::InvalidFile {
        path: path.to_path_buf(),
        message: format!("expected a JSON object: {e}"),
    })
}

/// Writes brain data to `path` as pretty JSON.
pub fn write_brain(path: &Path, data: &BrainData) -> Result<(), CliError> {
    let mut bytes = serde_json::to_vec_pretty(data)?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

/// Host whose mapping lives in a JSON file.
///
/// Every snapshot re-reads the file, so edits made while the process runs
/// are picked up on the next save. If the file becomes unreadable or
/// disappears the last good contents are used.
pub struct FileBrain {
    path: PathBuf,
    last_good: RwLock<BrainData>,
    auto_save: AtomicBool,
    interval: RwLock<Duration>,
}

impl FileBrain {
    /// Opens the brain stored at `path`.
    ///
    /// A file that does not exist yet starts an empty brain; it is created
    /// when bootstrap merges the store's data.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let data = if path.exists() {
            read_brain(&path)?
        } else {
            BrainData::new()
        };
        Ok(Self {
            path,
            last_good: RwLock::new(data),
            auto_save: AtomicBool::new(true),
            interval: RwLock::new(Duration::from_secs(5)),
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BrainHost for FileBrain {
    fn snapshot(&self) -> BrainData {
        match read_brain(&self.path) {
            Ok(data) => {
                *self.last_good.write() = data.clone();
                data
            }
            Err(e) => {
                warn!(error = %e, "keeping last readable brain");
                self.last_good.read().clone()
            }
        }
    }

    fn merge_once(&self, data: BrainData) {
        let mut merged = self.last_good.write();
        merged.extend(data);
        if let Err(e) = write_brain(&self.path, &merged) {
            error!(error = %e, "failed to write merged brain");
        }
    }

    fn set_auto_save(&self, enabled: bool) {
        self.auto_save.store(enabled, Ordering::SeqCst);
    }

    fn auto_save_enabled(&self) -> bool {
        self.auto_save.load(Ordering::SeqCst)
    }

    fn reset_save_interval(&self, interval: Duration) {
        *self.interval.write() = interval;
    }

    fn save_interval(&self) -> Duration {
        *self.interval.read()
    }

    fn emit(&self, event: BrainEvent) {
        match event {
            BrainEvent::Connected { records } => info!(records, "brain connected"),
            BrainEvent::Saved { written, deleted } => info!(written, deleted, "brain saved"),
        }
    }
}
