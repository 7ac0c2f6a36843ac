//! End-to-end tests against the reference store.

use async_trait::async_trait;
use couchbrain_engine::{
    BrainEvent, BrainHost, BrainSync, DocumentStore, HttpStore, LoopbackClient, LoopbackServer,
    MemoryBrain, StoreConfig, SyncConfig, SyncError, SyncResult, SyncState,
};
use couchbrain_protocol::{BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse, Value};
use couchbrain_store::StoreServer;
use couchbrain_testkit::prelude::*;
use serde_json::json;
use std::sync::Arc;

/// Shares one reference store between engines and HTTP clients.
#[derive(Clone)]
struct SharedStore(Arc<StoreServer>);

impl SharedStore {
    fn new(server: StoreServer) -> Self {
        Self(Arc::new(server))
    }
}

#[async_trait]
impl DocumentStore for SharedStore {
    async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse> {
        self.0
            .handle_list(*request)
            .map_err(SyncError::transport_retryable)
    }

    async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse> {
        self.0
            .handle_bulk_write(request.clone())
            .map_err(SyncError::transport_retryable)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

impl LoopbackServer for SharedStore {
    fn handle_get(&self, path: &str) -> Result<Vec<u8>, String> {
        self.0.handle_get(path)
    }

    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        self.0.handle_post(path, body)
    }
}

fn config() -> SyncConfig {
    SyncConfig::new(StoreConfig::new("https://account.example.com", "hubot"))
}

async fn loaded(store: &SharedStore) -> (BrainSync<SharedStore>, MemoryBrain) {
    let engine = BrainSync::new(config(), store.clone());
    let brain = MemoryBrain::new();
    engine.load(&brain).await.unwrap();
    (engine, brain)
}

#[tokio::test]
async fn bootstrap_crosses_page_boundaries() {
    let store = SharedStore::new(seeded_store(250));
    let (engine, brain) = loaded(&store).await;

    assert_eq!(brain.snapshot(), seeded_data(250));
    assert_eq!(engine.tracked_keys().await, 250);
    // 3 pages of at most 100 rows
    assert_eq!(store.0.request_count(), 3);
    assert_eq!(brain.events(), vec![BrainEvent::Connected { records: 250 }]);
}

#[tokio::test]
async fn bootstrap_on_exact_page_multiple() {
    let store = SharedStore::new(seeded_store(200));
    let (engine, brain) = loaded(&store).await;

    assert_eq!(brain.snapshot().len(), 200);
    assert_eq!(engine.tracked_keys().await, 200);
    assert_eq!(store.0.request_count(), 2);
}

#[tokio::test]
async fn bootstrap_records_tokens_for_deleted_documents() {
    let store = SharedStore::new(seeded_store(2));
    {
        let (engine, brain) = loaded(&store).await;
        brain.remove(&seeded_key(0));
        engine.save_with(&brain).await.unwrap();
    }
    assert_eq!(store.0.row_count(), 2);
    assert_eq!(store.0.live_count(), 1);

    let (engine, brain) = loaded(&store).await;
    assert_eq!(brain.snapshot().len(), 1);
    assert_eq!(
        engine.revision(&seeded_key(0)).await,
        store.0.revision(&seeded_key(0))
    );

    // The tombstone token lets the key be written again
    brain.set(seeded_key(0), json!("back"));
    let report = engine.save_with(&brain).await.unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(store.0.live_count(), 2);
}

#[tokio::test]
async fn failed_bootstrap_never_becomes_ready() {
    let store = SharedStore::new(seeded_store(150));
    store.0.fail_next_requests(2);
    let engine = BrainSync::new(config(), store.clone());
    let brain = MemoryBrain::new();

    assert!(engine.load(&brain).await.is_err());
    assert_eq!(engine.state(), SyncState::Failed);
    assert!(brain.snapshot().is_empty());
    assert!(!brain.auto_save_enabled());
    assert!(engine.handle_save(&brain).await.is_none());
}

#[tokio::test]
async fn save_round_trip() {
    let store = SharedStore::new(StoreServer::default());
    store.0.put_out_of_band("a", json!(1));
    store.0.put_out_of_band("b", json!(2));
    let (engine, brain) = loaded(&store).await;

    brain.set("b", json!(3));
    brain.set("c", json!(4));
    let report = engine.save_with(&brain).await.unwrap();
    assert_eq!((report.written, report.deleted), (2, 0));

    brain.set("a", Value::Null);
    brain.set("b", json!(2));
    let report = engine.save_with(&brain).await.unwrap();
    assert_eq!((report.written, report.deleted), (1, 1));

    assert_eq!(store.0.live_count(), 2);
    assert!(store.0.document("a").unwrap().value.is_none());
    assert_eq!(store.0.document("b").unwrap().value, Some(json!(2)));
    assert_eq!(store.0.document("c").unwrap().value, Some(json!(4)));
    assert_eq!(engine.revision("b").await, store.0.revision("b"));

    // Nothing left to write
    let requests = store.0.request_count();
    assert!(engine.save_with(&brain).await.unwrap().is_noop());
    assert_eq!(store.0.request_count(), requests);
}

#[tokio::test]
async fn rejection_is_isolated_from_the_batch() {
    let store = SharedStore::new(seeded_store(4));
    let (engine, brain) = loaded(&store).await;
    let stale = seeded_key(1);
    let before = engine.revision(&stale).await;

    // Another writer moves one key on
    store.0.put_out_of_band(&stale, json!("theirs"));
    for i in 0..4 {
        brain.set(seeded_key(i), json!({ "mine": i }));
    }

    let report = engine.save_with(&brain).await.unwrap();
    assert_eq!(report.submitted, 4);
    assert_eq!(report.written, 3);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].key, stale);
    assert_eq!(report.rejected[0].error.as_deref(), Some("conflict"));

    assert_eq!(engine.revision(&stale).await, before);
    assert_eq!(engine.baseline().await.get(&stale), Some(&seeded_value(1)));
    for i in [0, 2, 3] {
        let key = seeded_key(i);
        assert_eq!(engine.revision(&key).await, store.0.revision(&key));
    }

    // Same stale token, same rejection
    let again = engine.save_with(&brain).await.unwrap();
    assert_eq!(again.submitted, 1);
    assert_eq!(again.rejected.len(), 1);
    assert_eq!(store.0.document(&stale).unwrap().value, Some(json!("theirs")));
}

#[tokio::test]
async fn rejected_key_converges_after_resync() {
    let store = SharedStore::new(seeded_store(1));
    let key = seeded_key(0);
    {
        let (engine, brain) = loaded(&store).await;
        store.0.put_out_of_band(&key, json!("theirs"));
        brain.set(key.clone(), json!("mine"));
        let report = engine.save_with(&brain).await.unwrap();
        assert_eq!(report.rejected.len(), 1);
    }

    // A fresh bootstrap picks up the current token
    let (engine, brain) = loaded(&store).await;
    assert_eq!(engine.revision(&key).await, store.0.revision(&key));
    brain.set(key.clone(), json!("mine"));

    let report = engine.save_with(&brain).await.unwrap();
    assert!(report.rejected.is_empty());
    assert_eq!(store.0.document(&key).unwrap().value, Some(json!("mine")));
}

#[tokio::test]
async fn transport_failure_retries_same_delta() {
    let store = SharedStore::new(seeded_store(2));
    let (engine, brain) = loaded(&store).await;
    brain.set(seeded_key(0), json!("changed"));
    brain.remove(&seeded_key(1));

    store.0.fail_next_requests(1);
    assert!(engine.handle_save(&brain).await.is_none());
    assert_eq!(engine.baseline().await, seeded_data(2));
    assert_eq!(store.0.live_count(), 2);

    let report = engine.handle_save(&brain).await.unwrap();
    assert_eq!((report.written, report.deleted), (1, 1));
    assert_eq!(store.0.live_count(), 1);
    assert_eq!(engine.stats().failed_cycles, 1);
}

#[tokio::test]
async fn http_loopback_path() {
    let store = SharedStore::new(seeded_store(120));
    let client = LoopbackClient::new(store.clone());
    let http = HttpStore::new(&config().store, client);
    let engine = BrainSync::new(config(), http);
    let brain = MemoryBrain::new();

    engine.load(&brain).await.unwrap();
    assert_eq!(brain.snapshot().len(), 120);

    brain.set("fresh", json!({"via": "http"}));
    brain.set(seeded_key(5), Value::Null);
    let report = engine.save_with(&brain).await.unwrap();

    assert_eq!((report.written, report.deleted), (1, 1));
    assert_eq!(store.0.live_count(), 120);
    assert_eq!(engine.revision("fresh").await, store.0.revision("fresh"));
    assert!(engine.store().last_error().is_none());
}

#[tokio::test]
async fn http_failure_is_recorded_and_recovers() {
    let store = SharedStore::new(seeded_store(3));
    let http = HttpStore::new(&config().store, LoopbackClient::new(store.clone()));
    let engine = BrainSync::new(config(), http);
    let brain = MemoryBrain::new();
    engine.load(&brain).await.unwrap();

    brain.set("x", json!(1));
    store.0.fail_next_requests(1);
    assert!(engine.handle_save(&brain).await.is_none());
    assert!(engine.store().last_error().is_some());

    assert_eq!(engine.handle_save(&brain).await.unwrap().written, 1);
    assert_eq!(store.0.live_count(), 4);
}
