//! Consumption of a streamed model reply.
//!
//! [`StreamProcessor::process_stream_response`] reads chunks until the
//! stream ends, cutting sentences out of the growing buffer and handing each
//! one to the tracker and the playback orderer as soon as it is complete.

use crate::config::StreamConfig;
use crate::error::Result;
use crate::pipeline::links::{linkify, popup_content};
use crate::pipeline::log_reducer::reduce;
use crate::pipeline::messages::{Message, Role, Utterance};
use crate::pipeline::playback::PlaybackOrderer;
use crate::pipeline::segmenter::{SentenceSegmenter, SentenceUnit};
use crate::pipeline::session::SharedSession;
use crate::pipeline::tracker::TagCodeBlockTracker;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Incremental source of reply text.
#[async_trait]
pub trait ChunkReader: Send {
    /// Next chunk, or `None` once the stream is done.
    async fn read(&mut self) -> Result<Option<String>>;

    /// Release the underlying stream. Called once when processing ends.
    fn release(&mut self) {}
}

/// Reader over pre-split text, used for canned replies and replays.
#[derive(Debug, Clone, Default)]
pub struct StaticChunks {
    chunks: VecDeque<String>,
}

impl StaticChunks {
    /// Reader yielding `chunks` in order.
    pub fn new(chunks: impl IntoIterator<Item = String>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Reader yielding `text` as one chunk.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new([text.into()])
    }

    /// Reader yielding `text` in pieces of at most `chunk_chars` characters.
    pub fn split(text: &str, chunk_chars: usize) -> Self {
        let size = chunk_chars.max(1);
        let chars: Vec<char> = text.chars().collect();
        Self::new(chars.chunks(size).map(|c| c.iter().collect::<String>()))
    }
}

#[async_trait]
impl ChunkReader for StaticChunks {
    async fn read(&mut self) -> Result<Option<String>> {
        Ok(self.chunks.pop_front())
    }
}

/// Per-reply state; dropped when the stream completes.
#[derive(Default)]
struct ReplyState {
    tracker: TagCodeBlockTracker,
    sentences: Vec<String>,
    log: Vec<Message>,
}

/// Drives one reply at a time through segmentation, tracking and playback.
#[derive(Clone)]
pub struct StreamProcessor {
    segmenter: SentenceSegmenter,
    orderer: PlaybackOrderer,
    session: Arc<SharedSession>,
    finalize_delay: Duration,
}

impl StreamProcessor {
    /// Create a processor from stream settings.
    pub fn new(config: &StreamConfig, orderer: PlaybackOrderer, session: Arc<SharedSession>) -> Self {
        Self {
            segmenter: SentenceSegmenter::new().with_clause_min_chars(config.clause_min_chars),
            orderer,
            session,
            finalize_delay: Duration::from_millis(config.finalize_delay_ms),
        }
    }

    /// Playback orderer used for this processor's sentences.
    pub fn orderer(&self) -> &PlaybackOrderer {
        &self.orderer
    }

    /// Consume `reader` to the end and return the compacted reply log.
    ///
    /// A read error ends the reply early; sentences already submitted for
    /// playback stand. The reader is released on every exit path.
    pub async fn process_stream_response(&self, reader: &mut dyn ChunkReader) -> Vec<Message> {
        let mut state = ReplyState::default();
        let mut buffer = String::new();

        loop {
            let chunk = match reader.read().await {
                Ok(chunk) => chunk,
                Err(e) => {
                    error!("stream read failed: {e}");
                    break;
                }
            };
            let done = chunk.is_none();
            if let Some(chunk) = chunk {
                buffer.push_str(&chunk);
            }

            if !state.tracker.capture_tag(&mut buffer) {
                if !done {
                    continue;
                }
                state.tracker.abandon_tag();
            }

            let consumed = {
                let mut units = self.segmenter.iter(&buffer);
                for unit in units.by_ref() {
                    self.handle_sentence(&mut state, unit);
                }
                buffer.len() - units.remainder().len()
            };
            buffer.drain(..consumed);

            if done {
                if !buffer.is_empty() {
                    let tail = std::mem::take(&mut buffer);
                    self.handle_sentence(&mut state, SentenceUnit::new(tail));
                }
                if let Some(code) = state.tracker.finish() {
                    debug!("unterminated code block at end of reply");
                    state.log.push(Message::code(code));
                }
                break;
            }
        }
        reader.release();

        tokio::time::sleep(self.finalize_delay).await;

        let compacted = reduce(&state.log);
        self.open_popup_for(&compacted);
        info!(
            sentences = state.sentences.len(),
            entries = compacted.len(),
            "reply processed"
        );
        compacted
    }

    fn handle_sentence(&self, state: &mut ReplyState, unit: SentenceUnit) {
        if !unit.text().is_empty() {
            state.sentences.push(unit.text().to_owned());
        }
        let tracked = state.tracker.track(&unit);

        for block in tracked.code_blocks {
            state.log.push(Message::code(block));
            self.session
                .set_assistant_message(linkify(&state.sentences.join(" ")));
        }

        let Some(speech) = tracked.speech else {
            return;
        };
        let speech = speech.trim();
        if speech.is_empty() {
            return;
        }
        state.log.push(Message::assistant(speech));
        self.orderer.submit(
            Utterance::new(state.tracker.tag(), speech),
            state.sentences.join(" "),
        );
    }

    fn open_popup_for(&self, compacted: &[Message]) {
        let full = compacted
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text_content)
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(content) = popup_content(&full) {
            debug!("reply contains links, opening popup");
            self.session.open_popup(content);
        }
    }
}
