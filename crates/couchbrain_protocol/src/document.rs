//! Documents as they travel between the brain and the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The brain's key-value mapping.
///
/// A `Value::Null` entry is a tombstone: the key is meant to be deleted
/// and is never stored as a value.
pub type BrainData = BTreeMap<String, Value>;

/// Revision metadata carried in the `value` field of a listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMeta {
    /// Current revision token.
    pub rev: String,
    /// Whether the document is a deletion tombstone.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
}

/// A stored document body as returned with `include_docs=true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Document key.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision token of this body.
    #[serde(rename = "_rev")]
    pub rev: String,
    /// The payload; absent on deletion tombstones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// One row of a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Document key.
    pub id: String,
    /// Set when the row describes a deleted document.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// Revision metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<RowMeta>,
    /// Document body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<StoredDocument>,
}

impl Row {
    /// Creates a row for a live document.
    pub fn live(id: impl Into<String>, rev: impl Into<String>, value: Value) -> Self {
        let id = id.into();
        let rev = rev.into();
        Self {
            id: id.clone(),
            deleted: false,
            value: Some(RowMeta {
                rev: rev.clone(),
                deleted: false,
            }),
            doc: Some(StoredDocument {
                id,
                rev,
                value: Some(value),
            }),
        }
    }

    /// Creates a row for a deleted document.
    pub fn tombstone(id: impl Into<String>, rev: impl Into<String>) -> Self {
        let id = id.into();
        let rev = rev.into();
        Self {
            id: id.clone(),
            deleted: true,
            value: Some(RowMeta {
                rev: rev.clone(),
                deleted: true,
            }),
            doc: Some(StoredDocument {
                id,
                rev,
                value: None,
            }),
        }
    }

    /// Returns the revision token, preferring the document body's.
    pub fn revision(&self) -> Option<&str> {
        self.doc
            .as_ref()
            .map(|doc| doc.rev.as_str())
            .or_else(|| self.value.as_ref().map(|meta| meta.rev.as_str()))
    }

    /// Returns true if the row or its metadata is flagged as deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted || self.value.as_ref().is_some_and(|meta| meta.deleted)
    }

    /// Returns the payload of a live row.
    ///
    /// Deleted rows and rows whose payload is null yield `None`.
    pub fn payload(&self) -> Option<&Value> {
        if self.is_deleted() {
            return None;
        }
        self.doc
            .as_ref()
            .and_then(|doc| doc.value.as_ref())
            .filter(|value| !value.is_null())
    }
}

/// A document submitted in a batched write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteDocument {
    /// Document key.
    #[serde(rename = "_id")]
    pub id: String,
    /// Revision being replaced; omitted for first-time creates.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// New payload; omitted for deletions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Deletion marker.
    #[serde(
        rename = "_deleted",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub deleted: bool,
}

impl WriteDocument {
    /// Creates a create-or-update document.
    pub fn change(id: impl Into<String>, rev: Option<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            rev,
            value: Some(value),
            deleted: false,
        }
    }

    /// Creates a deletion document.
    pub fn deletion(id: impl Into<String>, rev: Option<String>) -> Self {
        Self {
            id: id.into(),
            rev,
            value: None,
            deleted: true,
        }
    }

    /// Returns true if this document deletes its key.
    pub fn is_deletion(&self) -> bool {
        self.deleted
    }
}

/// The store's verdict on one document of a batched write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Document key.
    pub id: String,
    /// Whether the write was accepted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ok: bool,
    /// Revision token assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Error kind on rejection (e.g. `conflict`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl WriteOutcome {
    /// Creates an accepted outcome.
    pub fn accepted(id: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            rev: Some(rev.into()),
            error: None,
            reason: None,
        }
    }

    /// Creates a rejected outcome.
    pub fn rejected(
        id: impl Into<String>,
        error: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            ok: false,
            rev: None,
            error: Some(error.into()),
            reason: Some(reason.into()),
        }
    }

    /// Returns true if the store accepted the write and issued a new token.
    pub fn is_accepted(&self) -> bool {
        self.ok && self.rev.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_revision_prefers_document() {
        let row: Row = serde_json::from_value(json!({
            "id": "a",
            "key": "a",
            "value": { "rev": "1-meta" },
            "doc": { "_id": "a", "_rev": "2-doc", "value": 7 }
        }))
        .unwrap();

        assert_eq!(row.revision(), Some("2-doc"));
        assert_eq!(row.payload(), Some(&json!(7)));
    }

    #[test]
    fn row_revision_falls_back_to_meta() {
        let row: Row = serde_json::from_value(json!({
            "id": "a",
            "value": { "rev": "3-meta", "deleted": true },
            "doc": null
        }))
        .unwrap();

        assert_eq!(row.revision(), Some("3-meta"));
        assert!(row.is_deleted());
        assert_eq!(row.payload(), None);
    }

    #[test]
    fn deleted_row_has_no_payload() {
        let mut row = Row::live("a", "1-x", json!({"n": 1}));
        row.deleted = true;
        assert_eq!(row.payload(), None);
        assert_eq!(row.revision(), Some("1-x"));
    }

    #[test]
    fn null_payload_is_not_a_value() {
        let row: Row = serde_json::from_value(json!({
            "id": "a",
            "doc": { "_id": "a", "_rev": "1-x", "value": null }
        }))
        .unwrap();
        assert!(!row.is_deleted());
        assert_eq!(row.payload(), None);
    }

    #[test]
    fn write_document_wire_shape() {
        let create = WriteDocument::change("c", None, json!(4));
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({ "_id": "c", "value": 4 })
        );

        let delete = WriteDocument::deletion("a", Some("2-y".into()));
        assert!(delete.is_deletion());
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            json!({ "_id": "a", "_rev": "2-y", "_deleted": true })
        );
    }

    #[test]
    fn outcome_acceptance() {
        assert!(WriteOutcome::accepted("a", "2-z").is_accepted());
        assert!(!WriteOutcome::rejected("a", "conflict", "Document update conflict.").is_accepted());

        // An "ok" without a token cannot be applied to the ledger.
        let odd: WriteOutcome = serde_json::from_value(json!({ "id": "a", "ok": true })).unwrap();
        assert!(!odd.is_accepted());
    }
}
