//! Revisioned document table.

use crate::error::{StoreError, StoreResult};
use couchbrain_protocol::{ListResponse, Row, StoredDocument, Value, WriteDocument};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One stored key, live or tombstoned.
#[derive(Debug, Clone)]
struct Entry {
    /// Number of accepted writes to this key.
    generation: u64,
    /// Current revision token.
    rev: String,
    /// Current payload; `None` once deleted.
    value: Option<Value>,
}

impl Entry {
    fn is_deleted(&self) -> bool {
        self.value.is_none()
    }

    fn to_row(&self, id: &str) -> Row {
        match &self.value {
            Some(value) => Row::live(id, self.rev.clone(), value.clone()),
            None => Row::tombstone(id, self.rev.clone()),
        }
    }
}

/// The store's document table.
///
/// Keys are kept in sorted order so pagination is stable between pages
/// as long as no keys are inserted or removed concurrently.
pub struct DocumentTable {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl DocumentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns one page of rows, tombstones included.
    pub fn list(&self, skip: u64, limit: u32) -> ListResponse {
        let entries = self.entries.read();
        let rows = entries
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(limit as usize)
            .map(|(id, entry)| entry.to_row(id))
            .collect();

        ListResponse::new(entries.len() as u64, skip, rows)
    }

    /// Applies one document of a batched write.
    ///
    /// Returns the newly issued revision token.
    pub fn write(&self, doc: &WriteDocument) -> StoreResult<String> {
        let mut entries = self.entries.write();
        let current = entries.get(&doc.id);

        if doc.is_deletion() {
            let entry = current
                .filter(|entry| !entry.is_deleted())
                .ok_or_else(|| StoreError::NotFound { key: doc.id.clone() })?;
            if doc.rev.as_deref() != Some(entry.rev.as_str()) {
                return Err(StoreError::Conflict { key: doc.id.clone() });
            }
            let next = Self::next_entry(&doc.id, entry.generation, None);
            let rev = next.rev.clone();
            entries.insert(doc.id.clone(), next);
            return Ok(rev);
        }

        let value = doc
            .value
            .clone()
            .filter(|value| !value.is_null())
            .ok_or_else(|| {
                StoreError::InvalidRequest(format!("document {} has no value", doc.id))
            })?;

        let generation = match (current, doc.rev.as_deref()) {
            (None, None) => 0,
            (None, Some(_)) => return Err(StoreError::Conflict { key: doc.id.clone() }),
            (Some(entry), None) if entry.is_deleted() => entry.generation,
            (Some(entry), Some(rev)) if rev == entry.rev => entry.generation,
            (Some(_), _) => return Err(StoreError::Conflict { key: doc.id.clone() }),
        };

        let next = Self::next_entry(&doc.id, generation, Some(value));
        let rev = next.rev.clone();
        entries.insert(doc.id.clone(), next);
        Ok(rev)
    }

    /// Writes a value bypassing revision checks, as another writer would.
    ///
    /// Returns the new revision token.
    pub fn put_out_of_band(&self, key: &str, value: Value) -> String {
        let mut entries = self.entries.write();
        let generation = entries.get(key).map_or(0, |entry| entry.generation);
        let next = Self::next_entry(key, generation, Some(value));
        let rev = next.rev.clone();
        entries.insert(key.to_string(), next);
        rev
    }

    /// Returns the stored document for a key, tombstones included.
    pub fn document(&self, key: &str) -> Option<StoredDocument> {
        self.entries.read().get(key).map(|entry| StoredDocument {
            id: key.to_string(),
            rev: entry.rev.clone(),
            value: entry.value.clone(),
        })
    }

    /// Returns the current revision token for a key.
    pub fn revision(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).map(|entry| entry.rev.clone())
    }

    /// Returns the number of rows, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the number of live documents.
    pub fn live_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_deleted())
            .count()
    }

    fn next_entry(key: &str, generation: u64, value: Option<Value>) -> Entry {
        let generation = generation + 1;
        Entry {
            generation,
            rev: Self::revision_token(key, generation, value.as_ref()),
            value,
        }
    }

    fn revision_token(key: &str, generation: u64, value: Option<&Value>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(generation.to_be_bytes());
        match value {
            Some(value) => hasher.update(value.to_string().as_bytes()),
            None => hasher.update(b"_deleted"),
        }
        let digest = hasher.finalize();
        let hex: String = digest[..16].iter().map(|b| format!("{b:02x}")).collect();
        format!("{generation}-{hex}")
    }
}

impl Default for DocumentTable {
    fn default() -> Self {
        Self::new()
    }
}
