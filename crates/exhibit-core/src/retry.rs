//! Declarative retry policy with capped exponential backoff.

use serde::{Deserialize, Serialize};

/// How often and how patiently to retry a failing platform call.
///
/// Attempts are numbered from 1. The delay before attempt `n + 1` is
/// `base_delay_ms * multiplier^(n - 1)`, capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            base_delay_ms: 100,
            multiplier: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempt` failed.
    #[inline]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1) as i32;
        let delay = self.base_delay_ms as f64 * self.multiplier.max(1.0).powi(exp);
        (delay.round() as u64).min(self.max_delay_ms)
    }

    /// Total time spent waiting if every attempt fails.
    pub fn total_delay(&self) -> u64 {
        (1..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }
}
