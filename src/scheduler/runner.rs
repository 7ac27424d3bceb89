//! Correction scheduler background loop.
//!
//! Every interval the pending transcriptions are claimed, formatted and sent
//! to the correction service. The corrected text (or, on failure, the raw
//! formatted text) is appended to the corrected-text log. Claimed fragments
//! are never re-queued.

use crate::config::CorrectionConfig;
use crate::correction::CorrectionService;
use crate::error::Result;
use crate::runtime::RuntimeEvent;
use crate::scheduler::retry::RetryPolicy;
use crate::transcript::{CorrectedTextStore, Transcription, TranscriptionBuffer};
use chrono::{FixedOffset, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timestamp format for fragments sent to correction.
const TIME_FORMAT: &str = "%H:%M:%S";

/// How one correction cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionOutcome {
    /// The service answered; its text was stored.
    Corrected(String),
    /// Every attempt failed; the raw formatted text was stored.
    Fallback(String),
}

/// Timer-driven consumer of the transcription buffer.
pub struct CorrectionScheduler {
    buffer: Arc<TranscriptionBuffer>,
    corrected: Arc<CorrectedTextStore>,
    service: Arc<dyn CorrectionService>,
    interval: Duration,
    retry: RetryPolicy,
    display_offset: Option<FixedOffset>,
    runtime_tx: Option<broadcast::Sender<RuntimeEvent>>,
}

impl CorrectionScheduler {
    /// Scheduler draining `buffer` into `corrected` through `service`.
    ///
    /// Interval, retry and display offset come from `config`.
    pub fn new(
        config: &CorrectionConfig,
        buffer: Arc<TranscriptionBuffer>,
        corrected: Arc<CorrectedTextStore>,
        service: Arc<dyn CorrectionService>,
    ) -> Self {
        let display_offset = config.display_utc_offset_minutes.and_then(|minutes| {
            let offset = FixedOffset::east_opt(minutes.saturating_mul(60));
            if offset.is_none() {
                warn!(minutes, "invalid display offset, using local time");
            }
            offset
        });
        Self {
            buffer,
            corrected,
            service,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            retry: RetryPolicy::from_config(config),
            display_offset,
            runtime_tx: None,
        }
    }

    /// Publish [`RuntimeEvent::CorrectedTextUpdated`] after each change.
    pub fn with_runtime_events(mut self, tx: broadcast::Sender<RuntimeEvent>) -> Self {
        self.runtime_tx = Some(tx);
        self
    }

    /// Override the retry policy taken from config.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Time between correction cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the periodic loop. The first tick fires one interval after
    /// start.
    ///
    /// Cancelling stops future ticks; a correction already in flight runs to
    /// completion.
    pub fn run(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "correction scheduler started");
            let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                self.tick().await;
            }
            info!("correction scheduler stopped");
        })
    }

    /// Run one correction cycle. Returns `None` when nothing was buffered.
    pub async fn tick(&self) -> Option<CorrectionOutcome> {
        let claimed = self.buffer.snapshot_and_clear();
        if claimed.is_empty() {
            debug!("no transcriptions to correct");
            return None;
        }

        let text = self.format_fragments(&claimed);
        debug!(fragments = claimed.len(), "sending transcriptions for correction");

        let outcome = match self.correct_with_retry(&text).await {
            Ok(corrected) => {
                self.corrected.push(corrected.clone());
                CorrectionOutcome::Corrected(corrected)
            }
            Err(e) => {
                warn!("correction failed, keeping raw transcript: {e}");
                self.corrected.push(text.clone());
                CorrectionOutcome::Fallback(text)
            }
        };
        self.notify();
        Some(outcome)
    }

    /// Empty both the corrected log and the pending buffer.
    pub fn clear_transcriptions(&self) {
        self.corrected.clear();
        self.buffer.clear();
        info!("transcriptions cleared");
        self.notify();
    }

    /// Render fragments as `HH:MM:SS: text` lines.
    pub fn format_fragments(&self, fragments: &[Transcription]) -> String {
        fragments
            .iter()
            .map(|t| {
                let time = match self.display_offset {
                    Some(offset) => t.timestamp.with_timezone(&offset).format(TIME_FORMAT),
                    None => t.timestamp.with_timezone(&Local).format(TIME_FORMAT),
                };
                format!("{time}: {}", t.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn correct_with_retry(&self, text: &str) -> Result<String> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.service.correct(text).await {
                Ok(corrected) => return Ok(corrected),
                Err(e) if self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for_attempt(attempts);
                    warn!(
                        attempt = attempts,
                        max_attempts = self.retry.max_attempts,
                        "correction attempt failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn notify(&self) {
        self.corrected.emit();
        if let Some(tx) = &self.runtime_tx {
            let _ = tx.send(RuntimeEvent::CorrectedTextUpdated);
        }
    }
}
