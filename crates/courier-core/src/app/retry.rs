//! Retry policy for failed tasks.

use std::time::Duration;

use crate::domain::ErrorKind;

/// Upper bound for a single backoff delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// How many times a task may run and how long to wait in between.
///
/// The default performs a single attempt. Retrying calendar or mail calls is
/// an operator decision, so it has to be switched on explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total executions allowed, including the first one. Never below 1.
    pub max_attempts: u32,

    pub base_delay: Duration,

    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
        }
    }

    /// `attempts` is the number of executions already made.
    pub fn should_retry(&self, attempts: u32, kind: ErrorKind) -> bool {
        kind.is_retryable() && attempts < self.max_attempts
    }

    /// Delay before the next try: base_delay * multiplier^(attempts - 1),
    /// capped at [`MAX_RETRY_DELAY`].
    ///
    /// With base_delay=500ms, multiplier=2.0: 500ms, 1s, 2s, 4s, ...
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // overflow, infinity and NaN all land on the cap
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}
