//! # couchbrain Engine
//!
//! Persistence adapter keeping an in-memory brain in step with a remote
//! revisioned document store.
//!
//! This crate provides:
//! - Paginated bootstrap of the whole key space
//! - A revision ledger and a snapshot cache of the persisted baseline
//! - A diff engine producing the minimal set of writes per save
//! - A reconciler that submits one batch and records accepted results only
//! - A state machine driving bootstrap and save cycles
//! - HTTP transport abstraction plus a mock store for tests
//!
//! ## Save cycle
//!
//! 1. Diff the host's mapping against the snapshot cache
//! 2. Submit every change and deletion in one batched write
//! 3. Record the new token and value of each accepted document
//!
//! ## Key Invariants
//!
//! - Bookkeeping only ever reflects writes the store confirmed
//! - A rejected or unsent document is re-submitted on the next cycle
//! - The host mapping is written exactly once, after bootstrap
//! - Saves are refused until bootstrap completes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod autosave;
mod bootstrap;
mod config;
mod diff;
mod engine;
mod error;
mod host;
mod http;
mod ledger;
mod reconcile;
mod snapshot;
mod transport;

pub use autosave::AutoSave;
pub use bootstrap::{load_all, Bootstrap};
pub use config::{
    parse_legacy_url, StoreConfig, SyncConfig, DEFAULT_DATABASE, DEFAULT_SAVE_INTERVAL,
};
pub use diff::{diff, Diff};
pub use engine::{BrainSync, LoadReport, SaveReport, SyncState, SyncStats};
pub use error::{ConfigError, SyncError, SyncResult};
pub use host::{BrainEvent, BrainHost, MemoryBrain};
pub use http::{HttpClient, HttpStore, LoopbackClient, LoopbackServer};
pub use ledger::RevisionLedger;
pub use reconcile::{reconcile, ReconcileReport, Rejection};
pub use snapshot::{Bookkeeping, SnapshotCache};
pub use transport::{DocumentStore, MockStore};
