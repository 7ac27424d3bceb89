//! Speakstream: streaming speech front-end for a conversational agent.
//!
//! Two pipelines run side by side:
//! - **Reply**: model stream → sentence segmenter → tag/code-block tracker →
//!   ordered speech playback → compacted chat log
//! - **Transcript**: speech capture → transcription buffer → periodic
//!   correction → corrected-text log
//!
//! Shared state lives in [`pipeline::SharedSession`] and the transcript
//! stores; UI observers follow along through [`RuntimeEvent`]s.

pub mod agent;
pub mod app_dirs;
pub mod config;
pub mod correction;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod transcript;

pub use config::SpeechConfig;
pub use error::{Result, SpeechError};
pub use pipeline::coordinator::{ConversationCoordinator, ModelClient};
pub use runtime::RuntimeEvent;
pub use scheduler::CorrectionScheduler;
