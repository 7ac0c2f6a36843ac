//! Request handlers for the store endpoints.

use crate::config::ServerConfig;
use crate::error::{StoreError, StoreResult};
use crate::table::DocumentTable;
use couchbrain_protocol::{
    BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse, WriteOutcome,
};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Path suffix of the listing endpoint.
const ALL_DOCS: &str = "/_all_docs";
/// Path suffix of the batched write endpoint.
const BULK_DOCS: &str = "/_bulk_docs";

/// Context for request handling.
pub struct HandlerContext {
    /// Store configuration.
    pub config: ServerConfig,
    /// Document table (shared across all handlers).
    pub table: Arc<DocumentTable>,
    /// Number of upcoming requests to refuse.
    failures_pending: AtomicU32,
    /// Number of requests served or refused.
    requests: AtomicU64,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, table: Arc<DocumentTable>) -> Self {
        Self {
            config,
            table,
            failures_pending: AtomicU32::new(0),
            requests: AtomicU64::new(0),
        }
    }

    /// Makes the next `count` requests fail as if the store were unreachable.
    pub fn fail_next_requests(&self, count: u32) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Counts a request and consumes one injected failure, if any.
    fn admit(&self) -> StoreResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

/// Handler for store requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a listing request.
    pub fn handle_list(&self, request: ListRequest) -> StoreResult<ListResponse> {
        self.context.admit()?;
        let limit = request.limit.min(self.context.config.max_page_size);
        let page = self.context.table.list(request.skip, limit);
        debug!(skip = request.skip, rows = page.rows.len(), "listed page");
        Ok(page)
    }

    /// Handles a batched write.
    ///
    /// Each document is applied independently; a rejected document never
    /// prevents the others from being written.
    pub fn handle_bulk_write(&self, request: BulkWriteRequest) -> StoreResult<BulkWriteResponse> {
        self.context.admit()?;

        if request.len() > self.context.config.max_batch_size {
            return Err(StoreError::InvalidRequest(format!(
                "Too many documents: {} > {}",
                request.len(),
                self.context.config.max_batch_size
            )));
        }

        let outcomes = request
            .docs
            .iter()
            .map(|doc| match self.context.table.write(doc) {
                Ok(rev) => WriteOutcome::accepted(doc.id.clone(), rev),
                Err(e) => WriteOutcome::rejected(doc.id.clone(), e.error_kind(), e.to_string()),
            })
            .collect();

        Ok(BulkWriteResponse::new(outcomes))
    }

    /// Handles a GET on the loopback HTTP surface.
    pub fn handle_get(&self, path: &str) -> StoreResult<Vec<u8>> {
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        if !route.ends_with(ALL_DOCS) {
            return Err(StoreError::NoRoute(route.to_string()));
        }
        let request = ListRequest::from_query(query, self.context.config.max_page_size)?;
        Ok(self.handle_list(request)?.encode()?)
    }

    /// Handles a POST on the loopback HTTP surface.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> StoreResult<Vec<u8>> {
        if !path.ends_with(BULK_DOCS) {
            return Err(StoreError::NoRoute(path.to_string()));
        }
        let request = BulkWriteRequest::decode(body)?;
        Ok(self.handle_bulk_write(request)?.encode()?)
    }
}
