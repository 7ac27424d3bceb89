//! Integration test binary -- all integration tests consolidated into a single
//! binary.

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod correction_contract;
mod reply_pipeline;
mod transcript_pipeline;
