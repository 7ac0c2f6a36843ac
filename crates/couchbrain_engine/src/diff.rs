//! Diff between the host's live mapping and the persisted baseline.

use crate::ledger::RevisionLedger;
use crate::snapshot::SnapshotCache;
use couchbrain_protocol::{BrainData, Value, WriteDocument};
use std::collections::{BTreeMap, BTreeSet};

/// The delta one save cycle has to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    /// Frozen copies of new or modified values.
    pub changes: BTreeMap<String, Value>,
    /// Keys to delete.
    pub deletions: BTreeSet<String>,
    /// Documents for the batched write: changes first, then deletions.
    pub documents: Vec<WriteDocument>,
}

impl Diff {
    /// Returns true if there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns the number of documents to write.
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

/// Computes the documents that bring the store in line with `current`.
///
/// - A non-null value that differs from the baseline, or has no baseline,
///   is a change.
/// - A baseline key that is null or absent in `current` is a deletion.
/// - A null key without a baseline produces nothing.
///
/// Every document carries the key's ledger token when one exists.
pub fn diff(current: &BrainData, baseline: &SnapshotCache, ledger: &RevisionLedger) -> Diff {
    let mut out = Diff::default();

    for (key, value) in current {
        if value.is_null() {
            continue;
        }
        if baseline.get(key) != Some(value) {
            out.changes.insert(key.clone(), value.clone());
            out.documents.push(WriteDocument::change(
                key.clone(),
                ledger.get(key).map(String::from),
                value.clone(),
            ));
        }
    }

    for (key, _) in baseline.iter() {
        let present = current.get(key).is_some_and(|value| !value.is_null());
        if !present {
            out.deletions.insert(key.to_string());
            out.documents.push(WriteDocument::deletion(
                key,
                ledger.get(key).map(String::from),
            ));
        }
    }

    out
}
