//! Corrected transcript log with change observers.

use crate::store::KeyValueStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Store key holding the corrected text log.
pub const CORRECTED_TEXT_KEY: &str = "correctedText";

/// Change callback. Invoked with no payload; observers re-read the store.
pub type Observer = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`CorrectedTextStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Append-only corrected text, persisted across restarts.
pub struct CorrectedTextStore {
    entries: Mutex<Vec<String>>,
    observers: Mutex<BTreeMap<SubscriptionId, Observer>>,
    next_id: AtomicU64,
    store: Arc<dyn KeyValueStore>,
}

impl CorrectedTextStore {
    /// Open the log, replaying entries already in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = match store.get(CORRECTED_TEXT_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("discarding unreadable corrected text: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("failed to load corrected text: {e}");
                Vec::new()
            }
        };
        Self {
            entries: Mutex::new(entries),
            observers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            store,
        }
    }

    /// Append one entry. Observers are not notified; call [`Self::emit`].
    pub fn push(&self, text: impl Into<String>) {
        let mut entries = self.lock_entries();
        entries.push(text.into());
        self.persist(&entries);
    }

    /// Copy of every entry, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.lock_entries().clone()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.lock_entries();
        entries.clear();
        self.persist(&entries);
    }

    /// Register a change observer.
    pub fn subscribe(&self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_observers().insert(id, observer);
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock_observers().remove(&id).is_some()
    }

    /// Notify every observer that the text changed.
    pub fn emit(&self) {
        // Callbacks run outside the lock so they may subscribe or read.
        let observers: Vec<Observer> = self.lock_observers().values().cloned().collect();
        debug!(observers = observers.len(), "corrected text changed");
        for observer in observers {
            observer();
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_observers(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Observer>> {
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &[String]) {
        match serde_json::to_string(entries) {
            Ok(json) => {
                if let Err(e) = self.store.set(CORRECTED_TEXT_KEY, &json) {
                    warn!("failed to persist corrected text: {e}");
                }
            }
            Err(e) => warn!("failed to encode corrected text: {e}"),
        }
    }
}
