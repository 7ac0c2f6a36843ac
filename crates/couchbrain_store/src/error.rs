//! Error types for the reference store.

use couchbrain_protocol::ProtocolError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the reference store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Invalid request format.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The supplied revision token does not address the current version.
    #[error("document update conflict for {key}")]
    Conflict {
        /// Document key.
        key: String,
    },

    /// The key does not exist (or is already deleted).
    #[error("missing document {key}")]
    NotFound {
        /// Document key.
        key: String,
    },

    /// The store refused to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Unknown endpoint.
    #[error("no route for {0}")]
    NoRoute(String),

    /// Malformed payload.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl StoreError {
    /// Returns the CouchDB error kind reported in per-document outcomes.
    pub fn error_kind(&self) -> &'static str {
        match self {
            StoreError::Conflict { .. } => "conflict",
            StoreError::NotFound { .. } => "not_found",
            StoreError::InvalidRequest(_) | StoreError::Protocol(_) => "bad_request",
            StoreError::NoRoute(_) => "not_found",
            StoreError::Unavailable(_) => "unavailable",
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, StoreError::Unavailable(_))
    }
}
