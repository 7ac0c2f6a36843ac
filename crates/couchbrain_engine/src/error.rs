//! Error types for the sync engine.

use couchbrain_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during bootstrap or a save cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Protocol error (invalid message format).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A save was requested before bootstrap completed.
    #[error("not ready to save: bootstrap has not completed")]
    NotReady,

    /// Invalid state transition.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// A listed row carried no revision token.
    #[error("row {key:?} has no revision token")]
    MissingRevision {
        /// Document key.
        key: String,
    },

    /// Configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    ///
    /// A retryable failure during a save cycle is retried by the next
    /// save trigger, which recomputes the same diff.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::NotReady => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}

/// Errors raised while resolving the store configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `CLOUDANT_URL` nor `VCAP_SERVICES` is set.
    #[error("missing env var CLOUDANT_URL")]
    MissingUrl,

    /// `VCAP_SERVICES` is set but has no usable credentials.
    #[error("invalid VCAP_SERVICES: {0}")]
    InvalidServices(String),
}
