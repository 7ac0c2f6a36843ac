//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up reference stores
//! and brain mappings in a known state.

use couchbrain_protocol::{BrainData, Value};
use couchbrain_store::{ServerConfig, StoreServer};
use serde_json::json;

/// Returns the key of the `index`-th seeded document.
///
/// Keys are zero-padded so their sorted order matches `index`.
pub fn seeded_key(index: usize) -> String {
    format!("key-{index:05}")
}

/// Returns the value of the `index`-th seeded document.
pub fn seeded_value(index: usize) -> Value {
    json!({ "n": index, "tags": ["seed"] })
}

/// Returns the brain mapping that [`seeded_store`] holds.
pub fn seeded_data(count: usize) -> BrainData {
    (0..count).map(|i| (seeded_key(i), seeded_value(i))).collect()
}

/// Creates a reference store holding `count` live documents.
pub fn seeded_store(count: usize) -> StoreServer {
    seeded_store_with(ServerConfig::default(), count)
}

/// Creates a reference store with `config` holding `count` live documents.
pub fn seeded_store_with(config: ServerConfig, count: usize) -> StoreServer {
    let server = StoreServer::new(config);
    for (key, value) in seeded_data(count) {
        server.put_out_of_band(&key, value);
    }
    server
}

/// Builds a brain mapping from key/value pairs.
pub fn brain_data(pairs: &[(&str, Value)]) -> BrainData {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Returns `data` with every null value removed.
///
/// This is what the store ends up holding once `data` is saved.
pub fn without_tombstones(data: &BrainData) -> BrainData {
    data.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
