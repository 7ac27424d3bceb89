//! Periodic transcript correction.
//!
//! Runs the correction cycle on a fixed interval with an optional bounded
//! retry before falling back to the raw transcript.

pub mod retry;
pub mod runner;

pub use retry::RetryPolicy;
pub use runner::{CorrectionOutcome, CorrectionScheduler};
