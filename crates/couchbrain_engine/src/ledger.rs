//! Revision ledger.

use std::collections::BTreeMap;

/// Maps each known key to the revision token that addresses its current
/// remote version.
///
/// Keys of deleted remote documents may carry a token without a value in
/// the snapshot cache; the token is still needed to re-create them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionLedger {
    revisions: BTreeMap<String, String>,
}

impl RevisionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the token for a key, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, rev: impl Into<String>) {
        self.revisions.insert(key.into(), rev.into());
    }

    /// Returns the token for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.revisions.get(key).map(String::as_str)
    }

    /// Removes the token for a key.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.revisions.remove(key)
    }

    /// Returns true if the key has a token.
    pub fn contains(&self, key: &str) -> bool {
        self.revisions.contains_key(key)
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// Returns true if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Iterates over tracked keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.revisions.keys().map(String::as_str)
    }
}
