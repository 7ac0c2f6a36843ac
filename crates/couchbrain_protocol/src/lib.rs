//! # couchbrain Protocol
//!
//! Wire types and JSON codecs for talking to a revisioned document store.
//!
//! This crate provides:
//! - [`BrainData`], the key-value mapping the brain keeps in memory
//! - [`Row`] and [`StoredDocument`] as returned by the paginated listing
//! - [`WriteDocument`] and [`WriteOutcome`] for batched writes
//! - Request/response messages for listing and bulk writes
//!
//! The field names follow the CouchDB `_all_docs` and `_bulk_docs`
//! endpoints (`_id`, `_rev`, `_deleted`, `total_rows`).
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod messages;

pub use document::{BrainData, Row, RowMeta, StoredDocument, WriteDocument, WriteOutcome};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse};

/// Number of documents requested per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Re-export of the JSON value type used for document bodies.
pub use serde_json::Value;
