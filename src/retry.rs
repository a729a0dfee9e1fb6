//! # Retry Policy
//!
//! Attempt bound and linear backoff schedule for reconnecting after transport
//! failures. The waits themselves go through a [`Sleeper`] so tests can observe
//! the schedule without blocking.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of attempts per `execute` call (initial + retries)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default backoff time unit
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts before the last error is returned
    pub max_attempts: u32,

    /// Backoff after the n-th failed attempt (0-based) is `n * backoff_unit`
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    /// Whether another attempt is allowed after `completed` attempts have failed
    pub fn allows_retry(&self, completed: u32) -> bool {
        completed < self.max_attempts
    }

    /// Every wait a fully failing `execute` call goes through, in order.
    ///
    /// There is no wait after the final attempt.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts.saturating_sub(1)).map(move |attempt| self.backoff(attempt))
    }
}

/// Performs the blocking wait between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the calling thread with [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
