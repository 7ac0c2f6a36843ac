//! Sync engine state machine.

use crate::bootstrap::{load_all, Bootstrap};
use crate::config::SyncConfig;
use crate::diff::diff;
use crate::error::{SyncError, SyncResult};
use crate::host::{BrainEvent, BrainHost};
use crate::reconcile::{reconcile, Rejection};
use crate::snapshot::{Bookkeeping, SnapshotCache};
use crate::transport::DocumentStore;
use couchbrain_protocol::BrainData;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Bootstrap has not started.
    Idle,
    /// Bootstrap is paging through the store.
    Loading,
    /// Bootstrap completed; saves are accepted.
    Ready,
    /// A save cycle is in flight.
    Saving,
    /// Bootstrap failed; the engine never became ready.
    Failed,
}

impl SyncState {
    /// Returns true if bootstrap completed and no save is in flight.
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Ready)
    }

    /// Returns true if a save may be requested.
    ///
    /// A save requested while another is in flight waits for it.
    pub fn can_save(&self) -> bool {
        matches!(self, SyncState::Ready | SyncState::Saving)
    }

    /// Returns true if a bootstrap may start.
    pub fn can_load(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Failed)
    }
}

/// Statistics about save cycles.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Save cycles that reached the store or had nothing to write.
    pub cycles_completed: u64,
    /// Save cycles aborted by a request-level failure.
    pub failed_cycles: u64,
    /// Accepted creates and updates.
    pub documents_written: u64,
    /// Accepted deletions.
    pub documents_deleted: u64,
    /// Documents the store refused.
    pub rejections: u64,
    /// Last completed save.
    pub last_save_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a bootstrap.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Rows listed, tombstones included.
    pub records: u64,
    /// Keys merged into the host.
    pub values: usize,
    /// Listed rows without a value.
    pub tombstones: usize,
    /// Duration of the bootstrap.
    pub duration: Duration,
}

/// Result of a save cycle.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Documents submitted; zero for a no-op cycle.
    pub submitted: usize,
    /// Accepted creates and updates.
    pub written: usize,
    /// Accepted deletions.
    pub deleted: usize,
    /// Refused documents.
    pub rejected: Vec<Rejection>,
    /// Duration of the cycle.
    pub duration: Duration,
}

impl SaveReport {
    /// Returns true if the cycle had nothing to write.
    pub fn is_noop(&self) -> bool {
        self.submitted == 0
    }
}

/// Keeps a host's brain in step with a remote document store.
///
/// The engine owns the revision ledger and the snapshot cache. It bootstraps
/// once through [`BrainSync::load`], after which every save trigger runs one
/// diff-and-reconcile cycle through [`BrainSync::save`].
pub struct BrainSync<S: DocumentStore> {
    config: SyncConfig,
    store: S,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    books: Mutex<Bookkeeping>,
}

impl<S: DocumentStore> BrainSync<S> {
    /// Creates a new engine.
    pub fn new(config: SyncConfig, store: S) -> Self {
        Self {
            config,
            store,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            books: Mutex::new(Bookkeeping::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the revision token recorded for a key.
    pub async fn revision(&self, key: &str) -> Option<String> {
        self.books.lock().await.ledger.get(key).map(String::from)
    }

    /// Returns a copy of the persisted baseline.
    pub async fn baseline(&self) -> BrainData {
        self.books.lock().await.snapshot.as_data().clone()
    }

    /// Returns the number of keys with a revision token.
    pub async fn tracked_keys(&self) -> usize {
        self.books.lock().await.ledger.len()
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Bootstraps from the store and publishes the result into `host`.
    ///
    /// The host's autonomous saving is disabled while loading. On success
    /// the loaded data is merged into the host, saving is re-enabled at the
    /// configured interval and [`BrainEvent::Connected`] is emitted. On
    /// failure nothing is published and saving stays disabled.
    pub async fn load<H: BrainHost + ?Sized>(&self, host: &H) -> SyncResult<LoadReport> {
        let start = Instant::now();
        {
            let mut state = self.state.write();
            if !state.can_load() {
                return Err(SyncError::InvalidStateTransition {
                    from: format!("{:?}", *state),
                    to: "load".into(),
                });
            }
            *state = SyncState::Loading;
        }

        info!(database = %self.config.store.database, "connecting to store");
        host.set_auto_save(false);

        let loaded = match load_all(&self.store, self.config.page_size).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "bootstrap failed");
                self.set_state(SyncState::Failed);
                self.stats.write().last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let report = self.publish(loaded, host, start).await;
        info!("loaded {} records", report.records);
        host.emit(BrainEvent::Connected {
            records: report.records,
        });
        Ok(report)
    }

    async fn publish<H: BrainHost + ?Sized>(
        &self,
        loaded: Bootstrap,
        host: &H,
        start: Instant,
    ) -> LoadReport {
        let tombstones = loaded.tombstones();
        let values = loaded.working_copy.len();
        let snapshot = SnapshotCache::from_data(&loaded.working_copy);

        *self.books.lock().await = Bookkeeping::new(loaded.ledger, snapshot);
        host.merge_once(loaded.working_copy);
        host.set_auto_save(true);
        host.reset_save_interval(self.config.save_interval);
        self.set_state(SyncState::Ready);

        LoadReport {
            records: loaded.rows_seen,
            values,
            tombstones,
            duration: start.elapsed(),
        }
    }

    /// Runs one diff-and-reconcile cycle against `current`.
    ///
    /// Returns [`SyncError::NotReady`] before bootstrap completes. A cycle
    /// with nothing to write makes no request. Concurrent calls queue on
    /// the bookkeeping lock and run one after another.
    pub async fn save(&self, current: &BrainData) -> SyncResult<SaveReport> {
        let start = Instant::now();
        if !self.state().can_save() {
            return Err(SyncError::NotReady);
        }

        let mut books = self.books.lock().await;
        let delta = diff(current, &books.snapshot, &books.ledger);
        debug!("{} new or updated records", delta.len());

        if delta.is_empty() {
            self.record_cycle(&SaveReport::default());
            return Ok(SaveReport {
                duration: start.elapsed(),
                ..SaveReport::default()
            });
        }

        self.set_state(SyncState::Saving);
        let result = reconcile(&self.store, &delta, &mut books).await;
        // Queued saves take the lock next and set their own state
        self.set_state(SyncState::Ready);
        drop(books);

        match result {
            Ok(outcome) => {
                debug!("saved {} records", outcome.accepted());
                let report = SaveReport {
                    submitted: outcome.submitted,
                    written: outcome.written,
                    deleted: outcome.deleted,
                    rejected: outcome.rejected,
                    duration: start.elapsed(),
                };
                self.record_cycle(&report);
                Ok(report)
            }
            Err(e) => {
                let mut stats = self.stats.write();
                stats.failed_cycles += 1;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Saves the host's current mapping and signals completion.
    ///
    /// [`BrainEvent::Saved`] is emitted once every outcome is applied;
    /// no-op cycles emit nothing.
    pub async fn save_with<H: BrainHost + ?Sized>(&self, host: &H) -> SyncResult<SaveReport> {
        let current = host.snapshot();
        let report = self.save(&current).await?;
        if !report.is_noop() {
            host.emit(BrainEvent::Saved {
                written: report.written,
                deleted: report.deleted,
            });
        }
        Ok(report)
    }

    /// Host-facing save handler.
    ///
    /// Failures are logged and swallowed so they never reach the host; the
    /// next trigger retries from the unchanged baseline.
    pub async fn handle_save<H: BrainHost + ?Sized>(&self, host: &H) -> Option<SaveReport> {
        match self.save_with(host).await {
            Ok(report) => Some(report),
            Err(SyncError::NotReady) => {
                error!("still not ready to save");
                None
            }
            Err(e) => {
                error!(error = %e, "failed to save data");
                None
            }
        }
    }

    fn record_cycle(&self, report: &SaveReport) {
        let mut stats = self.stats.write();
        stats.cycles_completed += 1;
        stats.documents_written += report.written as u64;
        stats.documents_deleted += report.deleted as u64;
        stats.rejections += report.rejected.len() as u64;
        stats.last_save_time = Some(Instant::now());
        stats.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::host::MemoryBrain;
    use crate::transport::MockStore;
    use async_trait::async_trait;
    use couchbrain_protocol::{
        BulkWriteRequest, BulkWriteResponse, ListRequest, ListResponse, Row, WriteOutcome,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Holds every batched write until a permit is released.
    struct GatedStore {
        inner: MockStore,
        gate: Semaphore,
        entered: AtomicUsize,
    }

    impl GatedStore {
        fn new() -> Self {
            let inner = MockStore::new();
            inner.push_page(ListResponse::empty());
            Self {
                inner,
                gate: Semaphore::new(0),
                entered: AtomicUsize::new(0),
            }
        }

        fn entered(&self) -> usize {
            self.entered.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for GatedStore {
        async fn list(&self, request: &ListRequest) -> SyncResult<ListResponse> {
            self.inner.list(request).await
        }

        async fn bulk_write(&self, request: &BulkWriteRequest) -> SyncResult<BulkWriteResponse> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.gate
                .acquire()
                .await
                .map_err(|e| SyncError::transport_fatal(e.to_string()))?
                .forget();
            self.inner.bulk_write(request).await
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    async fn wait_for_writes(store: &GatedStore, count: usize) {
        while store.entered() < count {
            tokio::task::yield_now().await;
        }
    }

    fn engine_with(pages: Vec<ListResponse>) -> BrainSync<MockStore> {
        let store = MockStore::new();
        for page in pages {
            store.push_page(page);
        }
        let config = SyncConfig::new(StoreConfig::new("https://test.example.com", "hubot"));
        BrainSync::new(config, store)
    }

    fn seeded() -> Vec<ListResponse> {
        vec![ListResponse::new(
            3,
            0,
            vec![
                Row::live("a", "1-a", json!(1)),
                Row::live("b", "1-b", json!(2)),
                Row::tombstone("gone", "2-g"),
            ],
        )]
    }

    #[test]
    fn sync_state_checks() {
        assert!(SyncState::Idle.can_load());
        assert!(SyncState::Failed.can_load());
        assert!(!SyncState::Ready.can_load());
        assert!(SyncState::Ready.is_ready());
        assert!(!SyncState::Saving.is_ready());
        assert!(SyncState::Saving.can_save());
        assert!(!SyncState::Loading.can_save());
        assert!(!SyncState::Failed.can_save());
        assert!(!SyncState::Idle.can_save());
    }

    #[test]
    fn engine_initial_state() {
        let engine = engine_with(vec![]);
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.stats().cycles_completed, 0);
        assert_eq!(engine.config().page_size, 100);
    }

    #[tokio::test]
    async fn load_publishes_into_host() {
        let engine = engine_with(seeded());
        let brain = MemoryBrain::new();
        brain.set("local", json!("kept"));

        let report = engine.load(&brain).await.unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(report.values, 2);
        assert_eq!(report.tombstones, 1);
        assert_eq!(engine.state(), SyncState::Ready);
        assert_eq!(brain.get("a"), Some(json!(1)));
        assert_eq!(brain.get("local"), Some(json!("kept")));
        assert_eq!(brain.get("gone"), None);
        assert!(brain.auto_save_enabled());
        assert_eq!(brain.save_interval(), Duration::from_secs(30));
        assert_eq!(brain.events(), vec![BrainEvent::Connected { records: 3 }]);
        assert_eq!(engine.revision("gone").await, Some("2-g".into()));
        assert_eq!(engine.tracked_keys().await, 3);
        assert_eq!(engine.baseline().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_load_publishes_nothing() {
        let engine = engine_with(vec![]);
        engine.store().set_connected(false);
        let brain = MemoryBrain::new();

        assert!(engine.load(&brain).await.is_err());
        assert_eq!(engine.state(), SyncState::Failed);
        assert!(!brain.auto_save_enabled());
        assert!(brain.events().is_empty());
        assert!(engine.stats().last_error.is_some());

        // Saving is refused until a load succeeds
        assert!(matches!(
            engine.save(&BrainData::new()).await,
            Err(SyncError::NotReady)
        ));
    }

    #[tokio::test]
    async fn load_twice_is_refused() {
        let engine = engine_with(vec![ListResponse::empty()]);
        let brain = MemoryBrain::new();
        engine.load(&brain).await.unwrap();

        let err = engine.load(&brain).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn concurrent_load_is_refused() {
        let engine = engine_with(vec![ListResponse::empty()]);
        let first = MemoryBrain::new();
        let second = MemoryBrain::new();

        let (a, b) = tokio::join!(engine.load(&first), engine.load(&second));

        assert!(a.is_ok());
        assert!(matches!(b, Err(SyncError::InvalidStateTransition { .. })));
        assert_eq!(engine.store().list_requests().len(), 1);
        assert!(second.events().is_empty());
    }

    #[tokio::test]
    async fn queued_save_keeps_saving_state() {
        let config = SyncConfig::new(StoreConfig::new("https://test.example.com", "hubot"));
        let engine = BrainSync::new(config, GatedStore::new());
        engine.load(&MemoryBrain::new()).await.unwrap();

        let mut first = BrainData::new();
        first.insert("a".into(), json!(1));
        let mut second = first.clone();
        second.insert("b".into(), json!(2));

        let control = async {
            wait_for_writes(engine.store(), 1).await;
            assert_eq!(engine.state(), SyncState::Saving);
            engine.store().gate.add_permits(1);

            wait_for_writes(engine.store(), 2).await;
            assert_eq!(engine.state(), SyncState::Saving);
            engine.store().gate.add_permits(1);
        };
        let (a, b, ()) = tokio::join!(engine.save(&first), engine.save(&second), control);

        assert_eq!(a.unwrap().written, 1);
        let b = b.unwrap();
        assert_eq!(b.submitted, 1);
        assert_eq!(b.written, 1);
        assert_eq!(engine.state(), SyncState::Ready);
        assert_eq!(engine.tracked_keys().await, 2);
    }

    #[tokio::test]
    async fn save_before_load_is_not_ready() {
        let engine = engine_with(vec![]);
        let brain = MemoryBrain::new();
        brain.set("a", json!(1));

        assert!(engine.handle_save(&brain).await.is_none());
        assert!(engine.store().bulk_requests().is_empty());
    }

    #[tokio::test]
    async fn noop_save_makes_no_request() {
        let engine = engine_with(seeded());
        let brain = MemoryBrain::new();
        engine.load(&brain).await.unwrap();

        let report = engine.save_with(&brain).await.unwrap();

        assert!(report.is_noop());
        assert!(engine.store().bulk_requests().is_empty());
        assert_eq!(brain.events().len(), 1);
        assert_eq!(engine.stats().cycles_completed, 1);
    }

    #[tokio::test]
    async fn save_cycle_updates_bookkeeping_and_signals() {
        let engine = engine_with(seeded());
        let brain = MemoryBrain::new();
        engine.load(&brain).await.unwrap();

        brain.set("a", serde_json::Value::Null);
        brain.set("b", json!(3));
        brain.set("c", json!(4));
        let report = engine.save_with(&brain).await.unwrap();

        assert_eq!(report.submitted, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.deleted, 1);
        assert_eq!(engine.revision("a").await, None);
        assert_eq!(engine.baseline().await.get("c"), Some(&json!(4)));
        assert_eq!(
            brain.events().last(),
            Some(&BrainEvent::Saved {
                written: 2,
                deleted: 1
            })
        );
        // The host mapping is not touched by a save
        assert_eq!(brain.get("a"), Some(serde_json::Value::Null));

        let stats = engine.stats();
        assert_eq!(stats.documents_written, 2);
        assert_eq!(stats.documents_deleted, 1);
        assert!(stats.last_save_time.is_some());
    }

    #[tokio::test]
    async fn transport_failure_is_swallowed_and_retried() {
        let engine = engine_with(seeded());
        let brain = MemoryBrain::new();
        engine.load(&brain).await.unwrap();
        brain.set("b", json!(30));

        engine.store().set_connected(false);
        assert!(engine.handle_save(&brain).await.is_none());
        assert_eq!(engine.state(), SyncState::Ready);
        assert_eq!(engine.revision("b").await, Some("1-b".into()));
        assert_eq!(engine.stats().failed_cycles, 1);

        engine.store().set_connected(true);
        let report = engine.handle_save(&brain).await.unwrap();
        assert_eq!(report.written, 1);

        let requests = engine.store().bulk_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].docs[0].rev.as_deref(), Some("1-b"));
    }

    #[tokio::test]
    async fn rejections_are_counted() {
        let engine = engine_with(seeded());
        let brain = MemoryBrain::new();
        engine.load(&brain).await.unwrap();
        engine
            .store()
            .push_bulk_response(BulkWriteResponse::new(vec![WriteOutcome::rejected(
                "a",
                "conflict",
                "Document update conflict.",
            )]));

        brain.set("a", json!(100));
        let report = engine.save_with(&brain).await.unwrap();

        assert_eq!(report.rejected.len(), 1);
        assert_eq!(engine.stats().rejections, 1);
        assert_eq!(engine.baseline().await.get("a"), Some(&json!(1)));
    }
}
