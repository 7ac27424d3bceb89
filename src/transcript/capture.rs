//! Speech-capture loop feeding the transcription buffer.

use crate::transcript::buffer::TranscriptionBuffer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Event emitted by a continuous speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Interim hypothesis; never buffered.
    Recognizing(String),
    /// Final text for one utterance.
    Recognized(String),
    /// Audio was heard but nothing was recognized.
    NoMatch,
    /// Recognition was cancelled, optionally with error details.
    Canceled { reason: String, error: Option<String> },
    /// The recognition session ended.
    SessionStopped,
}

/// Spawn the capture loop.
///
/// Appends every non-empty `Recognized` text to `buffer`. Stops on
/// `Canceled`, `SessionStopped`, a closed channel or `cancel`; fragments
/// already buffered stay for the next correction cycle. The handle resolves
/// to the number of fragments appended.
pub fn run_transcription_capture(
    mut rx: mpsc::Receiver<RecognitionEvent>,
    buffer: Arc<TranscriptionBuffer>,
    cancel: CancellationToken,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        info!("speech capture started");
        let mut appended = 0;

        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => break,
                event = rx.recv() => event,
            };
            match event {
                Some(RecognitionEvent::Recognizing(text)) => debug!(%text, "recognizing"),
                Some(RecognitionEvent::Recognized(text)) => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    debug!(%text, "recognized");
                    buffer.append(text);
                    appended += 1;
                }
                Some(RecognitionEvent::NoMatch) => debug!("speech could not be recognized"),
                Some(RecognitionEvent::Canceled { reason, error }) => {
                    match error {
                        Some(details) => warn!(%reason, %details, "recognition canceled"),
                        None => info!(%reason, "recognition canceled"),
                    }
                    break;
                }
                Some(RecognitionEvent::SessionStopped) => {
                    info!("recognition session stopped");
                    break;
                }
                None => break,
            }
        }

        info!(appended, "speech capture stopped");
        appended
    })
}
