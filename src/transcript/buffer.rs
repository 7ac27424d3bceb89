//! Timestamped speech fragments awaiting correction.

use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Store key holding the pending fragments.
pub const TRANSCRIPTIONS_KEY: &str = "transcriptions";

/// One recognized speech fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    /// When the fragment was recognized.
    pub timestamp: DateTime<Utc>,
    /// Recognized text.
    pub text: String,
}

impl Transcription {
    /// Fragment captured at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

/// Append-only fragment buffer with atomic snapshot-and-clear.
///
/// Every mutation happens under one lock and is mirrored to the store before
/// the lock is released, so an append racing with a snapshot lands either
/// in that snapshot or in the buffer for the next cycle, never both and never
/// neither.
pub struct TranscriptionBuffer {
    entries: Mutex<Vec<Transcription>>,
    store: Arc<dyn KeyValueStore>,
}

impl TranscriptionBuffer {
    /// Create a buffer, reloading fragments a previous run left in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = load_entries(store.as_ref());
        if !entries.is_empty() {
            debug!(count = entries.len(), "restored pending transcriptions");
        }
        Self {
            entries: Mutex::new(entries),
            store,
        }
    }

    /// Append `text` stamped with the current time.
    pub fn append(&self, text: impl Into<String>) {
        self.push(Transcription::new(Utc::now(), text));
    }

    /// Append a fragment with an explicit timestamp.
    pub fn push(&self, transcription: Transcription) {
        let mut entries = self.lock();
        entries.push(transcription);
        self.persist(&entries);
    }

    /// Take every buffered fragment, leaving the buffer empty.
    pub fn snapshot_and_clear(&self) -> Vec<Transcription> {
        let mut entries = self.lock();
        let snapshot = std::mem::take(&mut *entries);
        if !snapshot.is_empty() {
            self.persist(&entries);
        }
        snapshot
    }

    /// Drop every buffered fragment.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }

    /// Copy of the buffered fragments.
    pub fn entries(&self) -> Vec<Transcription> {
        self.lock().clone()
    }

    /// Number of fragments waiting for the next cycle.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no fragments are waiting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Transcription>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &[Transcription]) {
        let json = match serde_json::to_string(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to encode transcriptions: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(TRANSCRIPTIONS_KEY, &json) {
            warn!("failed to persist transcriptions: {e}");
        }
    }
}

fn load_entries(store: &dyn KeyValueStore) -> Vec<Transcription> {
    match store.get(TRANSCRIPTIONS_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("discarding unreadable stored transcriptions: {e}");
            Vec::new()
        }),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("failed to load transcriptions: {e}");
            Vec::new()
        }
    }
}
