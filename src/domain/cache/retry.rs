//! Retry policy for cache connection acquisition

use std::time::Duration;

use serde::Deserialize;

/// Exponential backoff policy
///
/// Delays are a pure function of the attempt number. The total time spent
/// sleeping never exceeds `max_total_wait`, so a caller that exhausts the policy
/// always reaches its fallback within a bounded latency.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Cap on any single delay
    pub max_delay_ms: u64,
    /// Cap on the sum of all delays
    pub max_total_wait_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 50,
            backoff_multiplier: 2.0,
            max_delay_ms: 1000,
            max_total_wait_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A policy that makes a single attempt
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_initial_delay(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn with_max_total_wait(mut self, ms: u64) -> Self {
        self.max_total_wait_ms = ms;
        self
    }

    /// Delay to wait after the given failed attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.clamp(0.0, self.max_delay_ms as f64) as u64;

        Duration::from_millis(delay_ms)
    }

    /// The full sequence of delays between attempts
    ///
    /// Has at most `max_attempts - 1` entries; the last one is shortened so the
    /// sum stays within `max_total_wait_ms`, and the sequence ends once the
    /// budget is spent.
    pub fn delays(&self) -> Vec<Duration> {
        let budget = Duration::from_millis(self.max_total_wait_ms);
        let mut spent = Duration::ZERO;
        let mut delays = Vec::new();

        for attempt in 0..self.max_attempts.saturating_sub(1) {
            let remaining = budget.saturating_sub(spent);

            if remaining.is_zero() {
                break;
            }

            let delay = self.delay_for_attempt(attempt).min(remaining);
            spent += delay;
            delays.push(delay);
        }

        delays
    }

    /// Upper bound on the time spent sleeping across all retries
    pub fn total_wait(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}
