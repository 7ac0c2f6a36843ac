//! Snapshot cache and the bookkeeping pair it forms with the ledger.

use crate::ledger::RevisionLedger;
use couchbrain_protocol::{BrainData, Value};

/// Last value confirmed persisted for each key.
///
/// This is the baseline every save cycle diffs against. Values are owned
/// deep copies, never shared with the host's live mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotCache {
    values: BrainData,
}

impl SnapshotCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a baseline from loaded data.
    pub fn from_data(data: &BrainData) -> Self {
        Self {
            values: data.clone(),
        }
    }

    /// Returns the baseline value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Records a confirmed value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Forgets a key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns true if the key has a baseline value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of cached keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over cached entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the cached mapping.
    pub fn as_data(&self) -> &BrainData {
        &self.values
    }
}

/// The revision ledger and snapshot cache, mutated only together.
#[derive(Debug, Clone, Default)]
pub struct Bookkeeping {
    /// Revision token per key.
    pub ledger: RevisionLedger,
    /// Last persisted value per key.
    pub snapshot: SnapshotCache,
}

impl Bookkeeping {
    /// Creates bookkeeping from a completed bootstrap.
    pub fn new(ledger: RevisionLedger, snapshot: SnapshotCache) -> Self {
        Self { ledger, snapshot }
    }

    /// Records an accepted create or update.
    pub fn confirm_write(&mut self, key: &str, rev: impl Into<String>, value: Value) {
        self.ledger.insert(key, rev);
        self.snapshot.insert(key, value);
    }

    /// Records an accepted deletion.
    pub fn confirm_delete(&mut self, key: &str) {
        self.ledger.remove(key);
        self.snapshot.remove(key);
    }
}
