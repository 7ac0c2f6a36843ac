//! Periodic save driver.

use crate::engine::BrainSync;
use crate::host::BrainHost;
use crate::transport::DocumentStore;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Fires the host's save handler on the host's save interval.
///
/// Ticks are skipped while the host has autonomous saving disabled. The
/// interval is re-read after every tick, so a reset by the engine takes
/// effect on the next one. Saves never overlap: each tick awaits the
/// previous cycle.
pub struct AutoSave<S: DocumentStore, H: BrainHost> {
    engine: Arc<BrainSync<S>>,
    host: Arc<H>,
}

impl<S: DocumentStore, H: BrainHost> AutoSave<S, H> {
    /// Creates a driver for `engine` saving from `host`.
    pub fn new(engine: Arc<BrainSync<S>>, host: Arc<H>) -> Self {
        Self { engine, host }
    }

    /// Runs until `shutdown` resolves, then performs one final save.
    ///
    /// Returns the number of save cycles that completed.
    pub async fn run_until<F>(self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed = 0;

        loop {
            let period = self.host.save_interval();
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(period) => {
                    if !self.host.auto_save_enabled() {
                        debug!("auto-save disabled; skipping tick");
                        continue;
                    }
                    if self.engine.handle_save(self.host.as_ref()).await.is_some() {
                        completed += 1;
                    }
                }
            }
        }

        if self.engine.state().can_save() {
            info!("flushing brain before shutdown");
            if self.engine.handle_save(self.host.as_ref()).await.is_some() {
                completed += 1;
            }
        }
        completed
    }
}
