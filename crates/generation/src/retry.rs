//! Retry policy: attempt limits, exponential backoff and attempt timeouts.

use std::time::Duration;

use storyloom_config::RetryConfig;

/// How many times to try a generation call and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per logical call, including the first (at least 1)
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub initial_delay: Duration,
    /// Growth factor applied per further failure
    pub multiplier: f64,
    /// Upper bound for any single wait
    pub max_delay: Duration,
    /// Upper bound for a single attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            attempt_timeout: Duration::from_secs(120),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: config.initial_delay(),
            multiplier: config.multiplier,
            max_delay: config.max_delay(),
            attempt_timeout: config.attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Attempts allowed, never fewer than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait before `attempt` (1-based).
    ///
    /// Zero before the first attempt, `initial_delay` before the second, then
    /// multiplied once per further attempt and capped at `max_delay`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}
