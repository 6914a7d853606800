//! Bounded retry policy for sensor reads

use climate_shared::limits;
use std::time::Duration;

/// How often a short sensor read is retried, and how long to wait in between.
///
/// A read makes one initial attempt plus up to `retries` more, waiting `delay`
/// before each retry. The loop always runs to success or exhaustion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: limits::SENSOR_READ_RETRIES,
            delay: Duration::from_millis(limits::SENSOR_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Retry without waiting
    #[cfg(test)]
    pub fn immediate(retries: u32) -> Self {
        Self {
            retries,
            delay: Duration::ZERO,
        }
    }

    /// Total number of read requests issued before giving up
    pub fn max_attempts(&self) -> u32 {
        self.retries + 1
    }

    /// Time spent waiting when every attempt fails
    pub fn worst_case_delay(&self) -> Duration {
        self.delay * self.retries
    }
}
