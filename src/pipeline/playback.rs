//! Ordered speech playback and the display/slide state it drives.
//!
//! [`PlaybackOrderer`] hands each sentence to a [`SpeechPlayback`]
//! collaborator without waiting for it to finish. The collaborator plays
//! utterances one at a time in submission order and calls back on start and
//! end; the orderer turns those callbacks into display updates, a processing
//! count and a FIFO slide queue.

use crate::error::{Result, SpeechError};
use crate::pipeline::links::linkify;
use crate::pipeline::messages::Utterance;
use crate::pipeline::session::SharedSession;
use crate::runtime::RuntimeEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Callback fired when an utterance starts or finishes playing.
pub type PlaybackCallback = Box<dyn FnOnce() + Send + 'static>;

/// External speech-playback collaborator.
///
/// Implementations must play at most one utterance at a time, in the order
/// `speak` was called, and must eventually call `on_end` for every utterance
/// whose `on_start` was called.
pub trait SpeechPlayback: Send + Sync {
    /// Enqueue `utterance` and return immediately.
    fn speak(&self, utterance: Utterance, on_start: PlaybackCallback, on_end: PlaybackCallback);
}

/// Audio backend driven by [`QueuedPlayback`].
#[async_trait]
pub trait UtteranceSink: Send + 'static {
    /// Synthesize and play one utterance to completion.
    async fn play(&mut self, utterance: &Utterance) -> Result<()>;
}

struct QueuedUtterance {
    utterance: Utterance,
    on_start: PlaybackCallback,
    on_end: PlaybackCallback,
}

/// FIFO [`SpeechPlayback`] backed by a single worker task.
#[derive(Clone)]
pub struct QueuedPlayback {
    tx: mpsc::UnboundedSender<QueuedUtterance>,
}

impl QueuedPlayback {
    /// Spawn the playback worker around `sink`.
    ///
    /// On cancellation the worker stops playing but still fires both
    /// callbacks for every queued utterance so counters settle.
    pub fn spawn<S: UtteranceSink>(sink: S, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_playback_worker(sink, rx, cancel));
        (Self { tx }, handle)
    }
}

impl SpeechPlayback for QueuedPlayback {
    fn speak(&self, utterance: Utterance, on_start: PlaybackCallback, on_end: PlaybackCallback) {
        let queued = QueuedUtterance {
            utterance,
            on_start,
            on_end,
        };
        if let Err(mpsc::error::SendError(queued)) = self.tx.send(queued) {
            warn!("playback worker stopped, skipping audio");
            (queued.on_start)();
            (queued.on_end)();
        }
    }
}

async fn run_playback_worker<S: UtteranceSink>(
    mut sink: S,
    mut rx: mpsc::UnboundedReceiver<QueuedUtterance>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => None,
            item = rx.recv() => item,
        };
        let Some(item) = next else { break };

        (item.on_start)();
        if let Err(e) = sink.play(&item.utterance).await {
            warn!("playback error: {e}");
        }
        (item.on_end)();
    }

    rx.close();
    while let Ok(item) = rx.try_recv() {
        (item.on_start)();
        (item.on_end)();
    }
    debug!("playback worker exited");
}

/// Counter and slide queue shared by the start/end callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackOrderState {
    /// Utterances started but not yet finished.
    pub processing_count: usize,
    /// Sentences currently on the slide, oldest first.
    pub pending_slide_queue: VecDeque<String>,
}

/// Sequences sentences through a [`SpeechPlayback`] collaborator.
#[derive(Clone)]
pub struct PlaybackOrderer {
    playback: Arc<dyn SpeechPlayback>,
    session: Arc<SharedSession>,
    state: Arc<Mutex<PlaybackOrderState>>,
    count_tx: Arc<watch::Sender<usize>>,
    outstanding_tx: Arc<watch::Sender<usize>>,
}

impl PlaybackOrderer {
    /// Create an orderer writing display state into `session`.
    pub fn new(playback: Arc<dyn SpeechPlayback>, session: Arc<SharedSession>) -> Self {
        Self {
            playback,
            session,
            state: Arc::new(Mutex::new(PlaybackOrderState::default())),
            count_tx: Arc::new(watch::channel(0).0),
            outstanding_tx: Arc::new(watch::channel(0).0),
        }
    }

    /// Submit one sentence for playback.
    ///
    /// `display` is the cumulative reply text at submission time; it becomes
    /// the displayed message once this utterance starts.
    pub fn submit(&self, utterance: Utterance, display: String) {
        self.outstanding_tx.send_modify(|n| *n += 1);

        let sentence = utterance.text.clone();
        let on_start: PlaybackCallback = {
            let this = self.clone();
            Box::new(move || this.on_start(sentence, &display))
        };
        let on_end: PlaybackCallback = {
            let this = self.clone();
            Box::new(move || this.on_end())
        };

        debug!(text = %utterance.text, tag = %utterance.tag, "submitting utterance");
        self.playback.speak(utterance, on_start, on_end);
    }

    /// Current processing count.
    pub fn processing_count(&self) -> usize {
        *self.count_tx.borrow()
    }

    /// Snapshot of the counter and slide queue.
    pub fn state(&self) -> PlaybackOrderState {
        self.lock_state().clone()
    }

    /// Watch the processing count.
    pub fn subscribe_count(&self) -> watch::Receiver<usize> {
        self.count_tx.subscribe()
    }

    /// Wait until every submitted utterance has finished playing.
    pub async fn wait_idle(&self) -> Result<()> {
        let mut rx = self.outstanding_tx.subscribe();
        rx.wait_for(|n| *n == 0)
            .await
            .map(|_| ())
            .map_err(|e| SpeechError::Channel(format!("playback counter closed: {e}")))
    }

    fn on_start(&self, sentence: String, display: &str) {
        self.session.set_assistant_message(linkify(display));

        let (count, slides) = {
            let mut state = self.lock_state();
            state.processing_count += 1;
            state.pending_slide_queue.push_back(sentence);
            (
                state.processing_count,
                state.pending_slide_queue.iter().cloned().collect::<Vec<_>>(),
            )
        };
        self.publish(count, slides);
    }

    fn on_end(&self) {
        let (count, slides) = {
            let mut state = self.lock_state();
            match state.processing_count.checked_sub(1) {
                Some(n) => state.processing_count = n,
                None => warn!("playback end without matching start"),
            }
            state.pending_slide_queue.pop_front();
            (
                state.processing_count,
                state.pending_slide_queue.iter().cloned().collect::<Vec<_>>(),
            )
        };
        self.publish(count, slides);
        self.outstanding_tx.send_modify(|n| *n = n.saturating_sub(1));
    }

    fn publish(&self, count: usize, slides: Vec<String>) {
        self.count_tx.send_replace(count);
        self.session.set_slide_messages(slides);
        self.session.emit(RuntimeEvent::ProcessingCount(count));
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PlaybackOrderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
