//! The host application that owns the live brain mapping.

use couchbrain_protocol::BrainData;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Signals the engine publishes into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrainEvent {
    /// Bootstrap completed and the loaded data was merged.
    Connected {
        /// Number of rows listed during bootstrap.
        records: u64,
    },
    /// A save cycle finished applying its outcomes.
    Saved {
        /// Accepted creates and updates.
        written: usize,
        /// Accepted deletions.
        deleted: usize,
    },
}

/// The owner of the live key-value mapping.
///
/// The engine reads the mapping on every save and writes into it exactly
/// once, when bootstrap completes.
pub trait BrainHost: Send + Sync {
    /// Returns a copy of the current mapping.
    fn snapshot(&self) -> BrainData;

    /// Merges loaded data into the mapping; loaded keys win.
    fn merge_once(&self, data: BrainData);

    /// Enables or disables autonomous save triggers.
    fn set_auto_save(&self, enabled: bool);

    /// Returns true if autonomous saves are enabled.
    fn auto_save_enabled(&self) -> bool;

    /// Sets the periodic save interval.
    fn reset_save_interval(&self, interval: Duration);

    /// Returns the periodic save interval.
    fn save_interval(&self) -> Duration;

    /// Receives an engine signal.
    fn emit(&self, event: BrainEvent);
}

/// An in-process host mapping.
///
/// Autonomous saving starts enabled, as a host does before any persistence
/// adapter takes control of it.
pub struct MemoryBrain {
    data: RwLock<BrainData>,
    auto_save: AtomicBool,
    interval: RwLock<Duration>,
    events: RwLock<Vec<BrainEvent>>,
}

impl MemoryBrain {
    /// Creates an empty brain.
    pub fn new() -> Self {
        Self::with_data(BrainData::new())
    }

    /// Creates a brain holding `data`.
    pub fn with_data(data: BrainData) -> Self {
        Self {
            data: RwLock::new(data),
            auto_save: AtomicBool::new(true),
            interval: RwLock::new(Duration::from_secs(5)),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Sets a key; `Value::Null` marks it for deletion.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data.write().insert(key.into(), value);
    }

    /// Removes a key from the mapping.
    pub fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Replaces the whole mapping.
    pub fn replace(&self, data: BrainData) {
        *self.data.write() = data;
    }

    /// Returns the value of a key.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).cloned()
    }

    /// Returns every event emitted so far.
    pub fn events(&self) -> Vec<BrainEvent> {
        self.events.read().clone()
    }
}

impl Default for MemoryBrain {
    fn default() -> Self {
        Self::new()
    }
}

impl BrainHost for MemoryBrain {
    fn snapshot(&self) -> BrainData {
        self.data.read().clone()
    }

    fn merge_once(&self, data: BrainData) {
        self.data.write().extend(data);
    }

    fn set_auto_save(&self, enabled: bool) {
        self.auto_save.store(enabled, Ordering::SeqCst);
    }

    fn auto_save_enabled(&self) -> bool {
        self.auto_save.load(Ordering::SeqCst)
    }

    fn reset_save_interval(&self, interval: Duration) {
        *self.interval.write() = interval;
    }

    fn save_interval(&self) -> Duration {
        *self.interval.read()
    }

    fn emit(&self, event: BrainEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_unrelated_keys() {
        let brain = MemoryBrain::new();
        brain.set("local", json!(1));
        brain.set("shared", json!("old"));

        let mut loaded = BrainData::new();
        loaded.insert("shared".into(), json!("new"));
        brain.merge_once(loaded);

        assert_eq!(brain.get("local"), Some(json!(1)));
        assert_eq!(brain.get("shared"), Some(json!("new")));
    }

    #[test]
    fn controls_and_events() {
        let brain = MemoryBrain::new();
        assert!(brain.auto_save_enabled());

        brain.set_auto_save(false);
        brain.reset_save_interval(Duration::from_secs(30));
        brain.emit(BrainEvent::Connected { records: 3 });

        assert!(!brain.auto_save_enabled());
        assert_eq!(brain.save_interval(), Duration::from_secs(30));
        assert_eq!(brain.events(), vec![BrainEvent::Connected { records: 3 }]);
    }

    #[test]
    fn snapshot_is_detached() {
        let brain = MemoryBrain::new();
        brain.set("a", json!([1]));
        let snap = brain.snapshot();
        brain.remove("a");
        assert_eq!(snap["a"], json!([1]));
        assert_eq!(brain.get("a"), None);
    }
}
