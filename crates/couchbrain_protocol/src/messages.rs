//! Request and response messages for listing and batched writes.

use crate::document::{Row, WriteDocument, WriteOutcome};
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// A request for one page of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRequest {
    /// Number of rows to skip.
    pub skip: u64,
    /// Maximum number of rows to return.
    pub limit: u32,
}

impl ListRequest {
    /// Creates a new list request.
    pub fn new(skip: u64, limit: u32) -> Self {
        Self { skip, limit }
    }

    /// Creates the request for the first page.
    pub fn first_page(limit: u32) -> Self {
        Self::new(0, limit)
    }

    /// Returns the request for the page after `rows_seen` more rows.
    pub fn next(&self, rows_seen: usize) -> Self {
        Self::new(self.skip + rows_seen as u64, self.limit)
    }

    /// Renders the `_all_docs` query string (without the leading `?`).
    pub fn to_query(&self) -> String {
        format!("include_docs=true&skip={}&limit={}", self.skip, self.limit)
    }

    /// Parses an `_all_docs` query string.
    ///
    /// Missing parameters default to the first page of `default_limit` rows.
    pub fn from_query(query: &str, default_limit: u32) -> ProtocolResult<Self> {
        let mut request = Self::first_page(default_limit);
        for pair in query.trim_start_matches('?').split('&') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            match name {
                "skip" => {
                    request.skip = value.parse().map_err(|_| {
                        ProtocolError::invalid_structure(format!("invalid skip: {value}"))
                    })?;
                }
                "limit" => {
                    request.limit = value.parse().map_err(|_| {
                        ProtocolError::invalid_structure(format!("invalid limit: {value}"))
                    })?;
                }
                _ => {}
            }
        }
        Ok(request)
    }
}

/// One page of the document listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Total number of rows in the store.
    pub total_rows: u64,
    /// Offset of the first row of this page.
    #[serde(default)]
    pub offset: u64,
    /// Rows of this page.
    pub rows: Vec<Row>,
}

impl ListResponse {
    /// Creates a new list response.
    pub fn new(total_rows: u64, offset: u64, rows: Vec<Row>) -> Self {
        Self {
            total_rows,
            offset,
            rows,
        }
    }

    /// Creates the response of an empty store.
    pub fn empty() -> Self {
        Self::new(0, 0, Vec::new())
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A batched write request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BulkWriteRequest {
    /// Documents to write, applied independently by the store.
    pub docs: Vec<WriteDocument>,
}

impl BulkWriteRequest {
    /// Creates a new bulk write request.
    pub fn new(docs: Vec<WriteDocument>) -> Self {
        Self { docs }
    }

    /// Returns the number of documents in the batch.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns true if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Per-document outcomes of a batched write, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulkWriteResponse {
    /// One outcome per submitted document.
    pub outcomes: Vec<WriteOutcome>,
}

impl BulkWriteResponse {
    /// Creates a new bulk write response.
    pub fn new(outcomes: Vec<WriteOutcome>) -> Self {
        Self { outcomes }
    }

    /// Returns the number of accepted writes.
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
