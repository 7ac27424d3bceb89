//! Transcript pipeline: capture → buffer → correction → corrected log.

use crate::helpers::{drain_events, temp_store};
use serde_json::json;
use speakstream::RuntimeEvent;
use speakstream::config::CorrectionConfig;
use speakstream::correction::DifyCorrectionClient;
use speakstream::scheduler::{CorrectionOutcome, CorrectionScheduler};
use speakstream::store::{JsonFileStore, KeyValueStore};
use speakstream::transcript::{
    CorrectedTextStore, RecognitionEvent, TranscriptionBuffer, run_transcription_capture,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> CorrectionConfig {
    CorrectionConfig {
        api_url: format!("{}/v1/chat-messages", server.uri()),
        api_key: "test-key".to_owned(),
        display_utc_offset_minutes: Some(0),
        ..CorrectionConfig::default()
    }
}

#[tokio::test]
async fn captured_speech_is_corrected_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Hello world.",
            "conversation_id": "c1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (store, dir) = temp_store();
    let buffer = Arc::new(TranscriptionBuffer::new(store.clone()));
    let corrected = Arc::new(CorrectedTextStore::new(store.clone()));

    let (tx, rx) = mpsc::channel(8);
    let capture = run_transcription_capture(rx, Arc::clone(&buffer), CancellationToken::new());
    tx.send(RecognitionEvent::Recognized("hello".into())).await.unwrap();
    tx.send(RecognitionEvent::Recognized("world".into())).await.unwrap();
    tx.send(RecognitionEvent::SessionStopped).await.unwrap();
    assert_eq!(capture.await.unwrap(), 2);

    let config = config_for(&server);
    let client = Arc::new(DifyCorrectionClient::new(&config).unwrap());
    let (events_tx, mut events_rx) = broadcast::channel(8);
    let scheduler = CorrectionScheduler::new(
        &config,
        Arc::clone(&buffer),
        Arc::clone(&corrected),
        client,
    )
    .with_runtime_events(events_tx);

    let outcome = scheduler.tick().await;

    assert_eq!(
        outcome,
        Some(CorrectionOutcome::Corrected("Hello world.".to_owned()))
    );
    assert!(buffer.is_empty());
    assert_eq!(
        drain_events(&mut events_rx),
        vec![RuntimeEvent::CorrectedTextUpdated]
    );

    // A fresh process sees the corrected log and an empty buffer.
    let reopened: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(dir.path().join("store.json")).unwrap());
    assert_eq!(
        CorrectedTextStore::new(Arc::clone(&reopened)).entries(),
        vec!["Hello world."]
    );
    assert!(TranscriptionBuffer::new(reopened).is_empty());
}

#[tokio::test]
async fn service_failure_keeps_raw_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let (store, _dir) = temp_store();
    let buffer = Arc::new(TranscriptionBuffer::new(store.clone()));
    let corrected = Arc::new(CorrectedTextStore::new(store));
    buffer.append("hello");
    buffer.append("world");
    let raw = buffer
        .entries()
        .iter()
        .map(|t| format!("{}: {}", t.timestamp.format("%H:%M:%S"), t.text))
        .collect::<Vec<_>>()
        .join("\n");

    let config = config_for(&server);
    let client = Arc::new(DifyCorrectionClient::new(&config).unwrap());
    let scheduler = CorrectionScheduler::new(&config, Arc::clone(&buffer), Arc::clone(&corrected), client);

    assert_eq!(scheduler.tick().await, Some(CorrectionOutcome::Fallback(raw.clone())));
    assert_eq!(corrected.entries(), vec![raw]);
    assert!(buffer.is_empty());
}

#[tokio::test]
async fn fragments_after_a_cycle_wait_for_the_next_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    let (store, _dir) = temp_store();
    let buffer = Arc::new(TranscriptionBuffer::new(store.clone()));
    let corrected = Arc::new(CorrectedTextStore::new(store));
    let config = config_for(&server);
    let client = Arc::new(DifyCorrectionClient::new(&config).unwrap());
    let scheduler = CorrectionScheduler::new(&config, Arc::clone(&buffer), Arc::clone(&corrected), client);

    buffer.append("first");
    assert!(scheduler.tick().await.is_some());
    buffer.append("second");
    assert_eq!(buffer.len(), 1);

    assert!(scheduler.tick().await.is_some());
    assert!(scheduler.tick().await.is_none());
    assert_eq!(corrected.entries(), vec!["ok", "ok"]);
}
