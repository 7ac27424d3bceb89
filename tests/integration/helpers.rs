//! Shared helpers for integration tests.

use async_trait::async_trait;
use speakstream::pipeline::messages::Utterance;
use speakstream::pipeline::UtteranceSink;
use speakstream::runtime::RuntimeEvent;
use speakstream::store::JsonFileStore;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Open a file-backed store inside a fresh temp dir.
/// Returns `(store, tempdir)`; keep the dir alive for the test's duration.
pub(crate) fn temp_store() -> (Arc<JsonFileStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = JsonFileStore::open(dir.path().join("store.json")).expect("open store");
    (Arc::new(store), dir)
}

/// Sink that records spoken text and takes a little time per utterance.
pub(crate) struct RecordingSink {
    pub(crate) spoken: Arc<Mutex<Vec<String>>>,
    pub(crate) delay: Duration,
}

impl RecordingSink {
    pub(crate) fn new(delay: Duration) -> (Self, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                spoken: Arc::clone(&spoken),
                delay,
            },
            spoken,
        )
    }
}

#[async_trait]
impl UtteranceSink for RecordingSink {
    async fn play(&mut self, utterance: &Utterance) -> speakstream::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.spoken.lock().unwrap().push(utterance.spoken_text());
        Ok(())
    }
}

/// Drain all pending events from the broadcast receiver into a Vec.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<RuntimeEvent>) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        events.push(evt);
    }
    events
}
