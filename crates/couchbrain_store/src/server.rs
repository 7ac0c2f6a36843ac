//! Main store server.

use crate::config::ServerConfig;
use crate::handler::{HandlerContext, RequestHandler};
use crate::table::DocumentTable;
use couchbrain_protocol::{
    BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse, StoredDocument, Value,
};
use std::sync::Arc;

/// The reference document store.
///
/// This server answers listing and batched-write requests with the same
/// revision semantics as a CouchDB database. Requests can be issued as
/// typed messages or as raw HTTP paths and bodies.
///
/// # Example
///
/// ```
/// use couchbrain_protocol::ListRequest;
/// use couchbrain_store::{ServerConfig, StoreServer};
///
/// let server = StoreServer::new(ServerConfig::default());
/// server.put_out_of_band("greeting", serde_json::json!("hello"));
///
/// let page = server.handle_list(ListRequest::first_page(100)).unwrap();
/// assert_eq!(page.total_rows, 1);
/// ```
pub struct StoreServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl StoreServer {
    /// Creates a new store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_table(config, Arc::new(DocumentTable::new()))
    }

    /// Creates a store over an existing table.
    pub fn with_table(config: ServerConfig, table: Arc<DocumentTable>) -> Self {
        let context = Arc::new(HandlerContext::new(config, table));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles a listing request.
    pub fn handle_list(&self, request: ListRequest) -> Result<ListResponse, String> {
        self.handler.handle_list(request).map_err(|e| e.to_string())
    }

    /// Handles a batched write.
    pub fn handle_bulk_write(
        &self,
        request: BulkWriteRequest,
    ) -> Result<BulkWriteResponse, String> {
        self.handler
            .handle_bulk_write(request)
            .map_err(|e| e.to_string())
    }

    /// Handles a GET on the loopback HTTP surface.
    pub fn handle_get(&self, path: &str) -> Result<Vec<u8>, String> {
        self.handler.handle_get(path).map_err(|e| e.to_string())
    }

    /// Handles a POST on the loopback HTTP surface.
    pub fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.handler
            .handle_post(path, body)
            .map_err(|e| e.to_string())
    }

    /// Writes a value as another writer would, bypassing revision checks.
    pub fn put_out_of_band(&self, key: &str, value: Value) -> String {
        self.context.table.put_out_of_band(key, value)
    }

    /// Makes the next `count` requests fail.
    pub fn fail_next_requests(&self, count: u32) {
        self.context.fail_next_requests(count);
    }

    /// Returns the stored document for a key.
    pub fn document(&self, key: &str) -> Option<StoredDocument> {
        self.context.table.document(key)
    }

    /// Returns the current revision token for a key.
    pub fn revision(&self, key: &str) -> Option<String> {
        self.context.table.revision(key)
    }

    /// Returns the number of live documents.
    pub fn live_count(&self) -> usize {
        self.context.table.live_count()
    }

    /// Returns the number of rows, tombstones included.
    pub fn row_count(&self) -> usize {
        self.context.table.len()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> u64 {
        self.context.request_count()
    }
}

impl Default for StoreServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchbrain_protocol::WriteDocument;
    use serde_json::json;

    #[test]
    fn server_lifecycle() {
        let server = StoreServer::default();
        assert_eq!(server.row_count(), 0);
        assert_eq!(server.live_count(), 0);
        assert_eq!(server.request_count(), 0);
    }

    #[test]
    fn write_then_list() {
        let server = StoreServer::default();

        let response = server
            .handle_bulk_write(BulkWriteRequest::new(vec![
                WriteDocument::change("a", None, json!(1)),
                WriteDocument::change("b", None, json!(2)),
            ]))
            .unwrap();
        assert_eq!(response.accepted_count(), 2);

        let page = server.handle_list(ListRequest::first_page(1)).unwrap();
        assert_eq!(page.total_rows, 2);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(server.revision("a"), page.rows[0].revision().map(String::from));
    }

    #[test]
    fn shared_table() {
        let table = Arc::new(DocumentTable::new());
        let server = StoreServer::with_table(ServerConfig::default(), Arc::clone(&table));

        server.put_out_of_band("a", json!("x"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn failure_surfaces_as_message() {
        let server = StoreServer::default();
        server.fail_next_requests(1);
        let err = server.handle_list(ListRequest::first_page(10)).unwrap_err();
        assert!(err.contains("unavailable"));
    }
}
