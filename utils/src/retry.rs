//! Bounded retries with configurable backoff.

use std::time::Duration;

/// Maps a failed attempt number to the wait before the next attempt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Backoff {
    /// Wait the same duration after every failure.
    Constant(Duration),

    /// Wait `initial * multiplier^(attempt - 1)`, capped at `max`.
    Exponential {
        initial: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl Backoff {
    /// Returns the wait after the given failed attempt (starting at 1).
    ///
    /// An exponential wait is kept within `[0, max]`, whatever the multiplier.
    pub fn wait_after(&self, attempt: u32) -> Duration {
        match *self {
            Self::Constant(wait) => wait,
            Self::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let wait = initial.as_secs_f64() * multiplier.powi(exponent);
                if wait <= 0.0 {
                    return Duration::ZERO;
                }
                if !wait.is_finite() || wait >= max.as_secs_f64() {
                    return max;
                }
                Duration::from_secs_f64(wait)
            }
        }
    }
}

/// An immutable description of how often and how patiently to retry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of consecutive failed attempts tolerated (`None` for unbounded).
    pub max_attempts: Option<u32>,

    /// Wait between a failed attempt and the next one.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(100),
                multiplier: 2.0,
                max: Duration::from_secs(3),
            },
        }
    }
}

/// Tracks consecutive failures of a single operation against a [RetryPolicy].
#[derive(Clone, Debug)]
pub struct RetryTracker {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryTracker {
    /// Create a tracker with no recorded failures.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Record a failed attempt.
    pub fn attempt_failed(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Returns whether the operation may be attempted again.
    pub fn should_try_again(&self) -> bool {
        match self.policy.max_attempts {
            Some(max) => self.attempts < max,
            None => true,
        }
    }

    /// Returns the wait before the next attempt, given the failures recorded so far.
    pub fn next_wait(&self) -> Duration {
        self.policy.backoff.wait_after(self.attempts)
    }

    /// Forget all failures (called after a success).
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Returns the number of consecutive failures.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
