//! # Backoff Calculator
//!
//! Exponential backoff with bounded random jitter for retry republishing.
//!
//! ```text
//! delay  = min(base * 2^(attempt - 1), max)
//! jitter = uniform(0, delay * jitter_factor)
//! result = min(delay + jitter, max)
//! ```
//!
//! The jitter spreads simultaneous retries apart so a recovering downstream
//! is not hit by a synchronized wave.

use rand::Rng;

use crate::config::BackoffConfig;
use crate::error::Result;

/// Computes the delay before a retry attempt is republished.
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    config: BackoffConfig,
}

impl BackoffCalculator {
    pub fn new(config: BackoffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay in milliseconds before retry number `attempt` (1-based).
    ///
    /// `attempt = 0` is treated as 1 rather than rejected: the worker is in
    /// the middle of handling an outcome and a bad executor-reported count
    /// should not abort the envelope.
    pub fn calculate(&self, attempt: u32) -> u64 {
        let attempt = attempt.max(1);

        // Saturating arithmetic so large attempt counts cap out instead of
        // overflowing.
        let exponential = match 1u64.checked_shl(attempt - 1) {
            Some(factor) => self
                .config
                .base_delay_ms
                .saturating_mul(factor)
                .min(self.config.max_delay_ms),
            None => self.config.max_delay_ms,
        };

        let jitter_range = (exponential as f64 * self.config.jitter_factor) as u64;
        let jitter = if jitter_range == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_range)
        };

        exponential.saturating_add(jitter).min(self.config.max_delay_ms)
    }
}

impl Default for BackoffCalculator {
    fn default() -> Self {
        Self {
            config: BackoffConfig::default(),
        }
    }
}
