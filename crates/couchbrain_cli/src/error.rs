//! CLI error type.

use couchbrain_engine::{ConfigError, SyncError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// The store location could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bootstrap or save failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The HTTP client could not be built.
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    /// A brain file could not be read or written.
    #[error("{path}: {source}")]
    File {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A brain file does not hold a JSON object.
    #[error("{path}: {message}")]
    InvalidFile {
        /// File path.
        path: PathBuf,
        /// What is wrong with the contents.
        message: String,
    },

    /// Output could not be rendered.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}
