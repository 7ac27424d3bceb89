//! Reply pipeline: model stream → queued playback → compacted chat log.

use crate::helpers::{RecordingSink, drain_events};
use async_trait::async_trait;
use speakstream::config::SpeechConfig;
use speakstream::pipeline::messages::Message;
use speakstream::pipeline::{
    ChunkReader, ConversationCoordinator, ModelClient, PlaybackOrderer, QueuedPlayback,
    SharedSession, StaticChunks,
};
use speakstream::{RuntimeEvent, SpeechError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

struct FixedReply(&'static str);

#[async_trait]
impl ModelClient for FixedReply {
    async fn open_stream(&self, _messages: &[Message]) -> speakstream::Result<Box<dyn ChunkReader>> {
        if self.0.is_empty() {
            return Err(SpeechError::Stream("connection refused".into()));
        }
        Ok(Box::new(StaticChunks::split(self.0, 5)))
    }
}

fn fast_config() -> SpeechConfig {
    let mut config = SpeechConfig::default();
    config.stream.finalize_delay_ms = 0;
    config
}

#[tokio::test]
async fn spoken_reply_settles_and_commits() {
    let (events_tx, mut events_rx) = broadcast::channel(256);
    let session = Arc::new(SharedSession::new().with_runtime_events(events_tx));
    let (sink, spoken) = RecordingSink::new(Duration::from_millis(5));
    let cancel = CancellationToken::new();
    let (playback, worker) = QueuedPlayback::spawn(sink, cancel.clone());
    let orderer = PlaybackOrderer::new(Arc::new(playback), Arc::clone(&session));

    let coordinator = ConversationCoordinator::new(
        &fast_config(),
        Arc::clone(&session),
        Arc::new(FixedReply("[happy] Hello there. How are you today?")),
        orderer.clone(),
    );

    let reply = coordinator.send_chat("hi", None).await;
    orderer.wait_idle().await.unwrap();

    assert_eq!(
        reply,
        vec![Message::assistant("Hello there. How are you today?")]
    );
    assert_eq!(
        session.chat_log(),
        vec![
            Message::user("hi"),
            Message::assistant("Hello there. How are you today?")
        ]
    );
    assert_eq!(
        *spoken.lock().unwrap(),
        vec!["[happy] Hello there.", "[happy] How are you today?"]
    );
    assert_eq!(orderer.processing_count(), 0);
    assert!(session.slide_messages().is_empty());
    assert!(!session.is_chat_processing());

    let events = drain_events(&mut events_rx);
    assert!(events.contains(&RuntimeEvent::AgentSelected {
        agent: "Agent1".into()
    }));
    assert!(events.contains(&RuntimeEvent::ProcessingCount(1)));
    assert_eq!(
        events
            .iter()
            .rev()
            .find(|e| matches!(e, RuntimeEvent::ProcessingCount(_))),
        Some(&RuntimeEvent::ProcessingCount(0))
    );

    cancel.cancel();
    worker.await.unwrap();
}

#[tokio::test]
async fn consecutive_turns_accumulate_history() {
    let session = Arc::new(SharedSession::new());
    let (sink, _spoken) = RecordingSink::new(Duration::ZERO);
    let cancel = CancellationToken::new();
    let (playback, _worker) = QueuedPlayback::spawn(sink, cancel.clone());
    let orderer = PlaybackOrderer::new(Arc::new(playback), Arc::clone(&session));
    let coordinator = ConversationCoordinator::new(
        &fast_config(),
        Arc::clone(&session),
        Arc::new(FixedReply("Sure.")),
        orderer.clone(),
    );

    coordinator.send_chat("one", None).await;
    coordinator.send_chat("two", None).await;
    orderer.wait_idle().await.unwrap();

    assert_eq!(
        session.chat_log(),
        vec![
            Message::user("one"),
            Message::assistant("Sure."),
            Message::user("two"),
            Message::assistant("Sure."),
        ]
    );
    cancel.cancel();
}

#[tokio::test]
async fn failed_stream_keeps_user_message_only() {
    let session = Arc::new(SharedSession::new());
    let (sink, spoken) = RecordingSink::new(Duration::ZERO);
    let cancel = CancellationToken::new();
    let (playback, _worker) = QueuedPlayback::spawn(sink, cancel.clone());
    let orderer = PlaybackOrderer::new(Arc::new(playback), Arc::clone(&session));
    let coordinator = ConversationCoordinator::new(
        &fast_config(),
        Arc::clone(&session),
        Arc::new(FixedReply("")),
        orderer.clone(),
    );

    assert!(coordinator.send_chat("hello", None).await.is_empty());
    assert_eq!(session.chat_log(), vec![Message::user("hello")]);
    assert!(spoken.lock().unwrap().is_empty());
    assert_eq!(orderer.processing_count(), 0);
    cancel.cancel();
}
