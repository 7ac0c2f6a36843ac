//! Transport layer abstraction for the remote document store.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use couchbrain_protocol::{
    BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse, WriteOutcome,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A revisioned document store the brain is persisted to.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process, mock for testing, etc.).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one page of documents, bodies and revision tokens included.
    async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse>;

    /// Submits a batch of documents as a single write.
    ///
    /// Returns one outcome per submitted document. A request-level error
    /// means nothing is known about the individual documents.
    async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse>;

    /// Checks if the store is reachable.
    fn is_connected(&self) -> bool;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse> {
        (**self).list(request).await
    }

    async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse> {
        (**self).bulk_write(request).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// A mock store for testing.
///
/// Listing pages are served from a queue. Bulk writes use a queued
/// response when one is set and accept every document otherwise.
#[derive(Debug, Default)]
pub struct MockStore {
    connected: AtomicBool,
    pages: Mutex<VecDeque<ListResponse>>,
    bulk_responses: Mutex<VecDeque<BulkWriteResponse>>,
    list_requests: Mutex<Vec<ListRequest>>,
    bulk_requests: Mutex<Vec<BulkWriteRequest>>,
    next_rev: AtomicU64,
}

impl MockStore {
    /// Creates a new mock store.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Queues a listing page.
    pub fn push_page(&self, page: ListResponse) {
        self.pages.lock().push_back(page);
    }

    /// Queues a bulk write response.
    pub fn push_bulk_response(&self, response: BulkWriteResponse) {
        self.bulk_responses.lock().push_back(response);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns the listing requests received so far.
    pub fn list_requests(&self) -> Vec<ListRequest> {
        self.list_requests.lock().clone()
    }

    /// Returns the bulk write requests received so far.
    pub fn bulk_requests(&self) -> Vec<BulkWriteRequest> {
        self.bulk_requests.lock().clone()
    }

    fn accept_all(&self, request: &BulkWriteRequest) -> BulkWriteResponse {
        let outcomes = request
            .docs
            .iter()
            .map(|doc| {
                let n = self.next_rev.fetch_add(1, Ordering::SeqCst) + 1;
                WriteOutcome::accepted(doc.id.clone(), format!("{n}-mock"))
            })
            .collect();
        BulkWriteResponse::new(outcomes)
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse> {
        if !self.is_connected() {
            return Err(SyncError::transport_retryable("store unreachable"));
        }
        self.list_requests.lock().push(*request);
        self.pages
            .lock()
            .pop_front()
            .ok_or_else(|| SyncError::Protocol("No mock page set".into()))
    }

    async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse> {
        if !self.is_connected() {
            return Err(SyncError::transport_retryable("store unreachable"));
        }
        self.bulk_requests.lock().push(request.clone());
        let queued = self.bulk_responses.lock().pop_front();
        Ok(queued.unwrap_or_else(|| self.accept_all(request)))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
