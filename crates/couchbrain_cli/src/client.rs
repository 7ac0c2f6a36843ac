//! `reqwest`-backed HTTP client.

use async_trait::async_trait;
use couchbrain_engine::{HttpClient, HttpStore, StoreConfig};
use std::time::Duration;
use tracing::debug;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client speaking JSON to a CouchDB-compatible endpoint.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<Vec<u8>, String> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!(
                "{status}: {}",
                String::from_utf8_lossy(&body).trim()
            ));
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, String> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        Self::read(response).await
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        debug!(%url, bytes = body.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Self::read(response).await
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Opens the HTTP store for `config`.
pub fn connect(config: &StoreConfig) -> Result<HttpStore<ReqwestClient>, reqwest::Error> {
    Ok(HttpStore::new(config, ReqwestClient::new()?))
}
