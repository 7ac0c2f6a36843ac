//! # couchbrain Store
//!
//! Reference in-memory revisioned document store.
//!
//! This crate provides:
//! - A document table with CouchDB-style revision checks
//! - Paginated listing that includes deletion tombstones
//! - Batched writes with independent per-document outcomes
//! - A loopback HTTP surface (`_all_docs`, `_bulk_docs`) for transport tests
//! - Fault injection for connectivity tests
//!
//! # Revision rules
//!
//! - Creating a key that was never written requires no revision token
//! - Updating or deleting a live key requires its current token
//! - Re-creating a deleted key accepts no token or the tombstone's token
//! - Every accepted write issues a fresh token (`"{generation}-{digest}"`)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod table;

pub use config::ServerConfig;
pub use error::{StoreError, StoreResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::StoreServer;
pub use table::DocumentTable;
