//! Live transcription: capture, buffering and the corrected-text log.

pub mod buffer;
pub mod capture;
pub mod corrected;

pub use buffer::{Transcription, TranscriptionBuffer};
pub use capture::{RecognitionEvent, run_transcription_capture};
pub use corrected::{CorrectedTextStore, SubscriptionId};
