//! Periodically query the control plane without blocking.
//!
//! Each monitor is advanced by a `run` step that the host invokes repeatedly. A step either
//! starts a call (once the monitor's rate budget allows one) or checks whether the call in flight
//! has completed; it never waits. At most one call per monitor is in flight at a time.
//!
//! Failures the service reports as transient are retried after a backoff. Once the configured
//! number of attempts is exhausted (or a failure is not retryable), `run` returns the error and
//! keeps returning it on every later step.

pub mod count;
mod metrics;
pub mod range;

use std::time::{Duration, SystemTime};

/// Longest wait a monitor ever schedules (roughly a century).
const MAX_WAIT: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Returns the earliest time of the next call, `wait` after `now`.
///
/// Waits longer than [MAX_WAIT] are shortened to it. Never panics, even for waits that do not fit
/// in a [SystemTime].
fn deadline(now: SystemTime, wait: Duration) -> SystemTime {
    now.checked_add(wait.min(MAX_WAIT)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_deadline() {
        let now = UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(deadline(now, Duration::from_secs(5)), now + Duration::from_secs(5));
        assert_eq!(deadline(now, Duration::MAX), now + MAX_WAIT);
        assert_eq!(deadline(now, MAX_WAIT), now + MAX_WAIT);
    }
}
