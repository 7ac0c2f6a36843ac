//! HTTP transport implementation.
//!
//! This module speaks the CouchDB HTTP API (`_all_docs`, `_bulk_docs`).
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, hyper, an in-process loopback, etc.).

use crate::config::StoreConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::DocumentStore;
use async_trait::async_trait;
use couchbrain_protocol::{BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse};
use parking_lot::RwLock;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::sync::atomic::{AtomicBool, Ordering};

/// Characters escaped in a path segment, as `encodeURIComponent` does.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response body.
    async fn get(&self, url: &str) -> Result<Vec<u8>, String>;

    /// Sends a POST request with a JSON body and returns the response body.
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based document store.
///
/// Uses JSON encoding for request/response bodies.
pub struct HttpStore<C: HttpClient> {
    /// Base URL of the store (e.g., "https://account.cloudant.com").
    base_url: String,
    /// Database name.
    database: String,
    /// Database name as a single escaped path segment.
    database_segment: String,
    /// HTTP client implementation.
    client: C,
    /// Cleared once the store is closed.
    open: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpStore<C> {
    /// Creates a new HTTP store.
    pub fn new(config: &StoreConfig, client: C) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            database_segment: utf8_percent_encode(&config.database, SEGMENT).to_string(),
            client,
            open: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Stops the store from issuing further requests.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.database_segment, path)
    }

    fn ensure_open(&self) -> SyncResult<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SyncError::transport_fatal("store connection closed"))
        }
    }

    fn record(&self, result: Result<Vec<u8>, String>) -> SyncResult<Vec<u8>> {
        match result {
            Ok(body) => {
                *self.last_error.write() = None;
                Ok(body)
            }
            Err(e) => {
                *self.last_error.write() = Some(e.clone());
                Err(SyncError::transport_retryable(e))
            }
        }
    }
}

#[async_trait]
impl<C: HttpClient> DocumentStore for HttpStore<C> {
    async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse> {
        self.ensure_open()?;
        let url = self.endpoint(&format!("_all_docs?{}", request.to_query()));
        let body = self.record(self.client.get(&url).await)?;
        Ok(ListResponse::decode(&body)?)
    }

    async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse> {
        self.ensure_open()?;
        let url = self.endpoint("_bulk_docs");
        let body = request.encode()?;
        let response = self.record(self.client.post(&url, body).await)?;
        Ok(BulkWriteResponse::decode(&response)?)
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst) && self.client.is_healthy()
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a GET request for a path (query string included).
    fn handle_get(&self, path: &str) -> Result<Vec<u8>, String>;

    /// Handles a POST request and returns the response.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// Returns the server behind this client.
    pub fn server(&self) -> &S {
        &self.server
    }
}

/// Strips scheme and authority from a URL.
fn path_of(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(url, |i| &url[i + 3..]);
    after_scheme
        .find('/')
        .map_or("/", |i| &after_scheme[i..])
}

#[async_trait]
impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    async fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        self.server.handle_get(path_of(url))
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        self.server.handle_post(path_of(url), &body)
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
