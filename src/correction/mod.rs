//! Transcript correction service.

pub mod dify;

use crate::error::Result;
use async_trait::async_trait;

pub use dify::DifyCorrectionClient;

/// External service that polishes raw transcript text.
#[async_trait]
pub trait CorrectionService: Send + Sync {
    /// Return the corrected form of `text`.
    async fn correct(&self, text: &str) -> Result<String>;
}
