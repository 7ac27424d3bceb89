//! Bounded retry with exponential backoff for correction requests.

use crate::config::CorrectionConfig;
use std::time::Duration;

/// Default backoff multiplier between attempts.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Retry policy for one correction cycle.
///
/// `max_attempts` counts every call, the first included, so `1` means a
/// single attempt followed directly by the raw-text fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per cycle (at least 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Cap on the exponential delay.
    pub max_delay_ms: u64,
    /// Growth factor between retries.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryPolicy {
    /// Single-attempt policy with the default backoff settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy taken from the `[correction]` section.
    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Set the total number of attempts. Zero is treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set the upper bound on any single delay.
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Whether another attempt is allowed after `attempts` have failed.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// `min(base * multiplier^(retry-1), max)` plus 0-10% jitter.
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exp = self.backoff_multiplier.powi(retry as i32 - 1);
        let delay = (self.base_delay_ms as f64 * exp).min(self.max_delay_ms as f64);
        let jitter = delay * (rand::random::<f64>() * 0.1);
        Duration::from_millis((delay + jitter) as u64)
    }
}
