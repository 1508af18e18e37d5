//! Spread calls over time so that independent callers stay under a shared ceiling.

use rand::Rng;
use std::time::Duration;

/// Maximum relative deviation of a single offset from the mean offset (before normalization).
const JITTER: f64 = 0.5;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A ceiling on the call rate of one control-plane operation, shared by every instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateLimit {
    /// Calls per second the external service allows across all callers.
    pub per_second: u32,

    /// Fraction of `per_second` all instances together aim to use.
    ///
    /// The remainder is left to other consumers of the same API and to absorb bursts.
    pub utilization: f64,
}

impl RateLimit {
    /// Shard listings are limited to 100 per second, per stream.
    pub const LIST_SHARDS: Self = Self {
        per_second: 100,
        utilization: 0.1,
    };

    /// Stream summary descriptions are limited to 20 per second, per account.
    pub const DESCRIBE_STREAM_SUMMARY: Self = Self {
        per_second: 20,
        utilization: 0.1,
    };

    /// Calls per second all instances together may issue.
    pub fn target(&self) -> usize {
        (self.per_second as f64 * self.utilization) as usize
    }
}

/// A cyclic schedule of randomized waits between consecutive calls.
///
/// A full cycle holds `calls` offsets that add up to exactly one window, so any half-open interval
/// as long as the window contains at most `calls` call times when a caller waits at least
/// [RateBudget::next] between calls. Offsets are randomized so that instances constructed
/// independently do not fall into lockstep and burst against the shared ceiling.
#[derive(Clone, Debug)]
pub struct RateBudget {
    window: Duration,
    offsets: Vec<Duration>,
    cursor: usize,
}

impl RateBudget {
    /// Create a schedule of `calls` randomized offsets spanning `window`.
    ///
    /// # Panics
    ///
    /// Panics if `calls` is zero or if `window` is shorter than `calls` nanoseconds.
    pub fn new<R: Rng>(rng: &mut R, window: Duration, calls: usize) -> Self {
        assert!(calls > 0, "calls per window must be positive");
        let span = window.as_nanos();
        assert!(
            span >= calls as u128,
            "window must allow a positive offset per call"
        );

        // Sample relative weights around 1.0
        let weights: Vec<f64> = (0..calls)
            .map(|_| rng.gen_range((1.0 - JITTER)..(1.0 + JITTER)))
            .collect();
        let total: f64 = weights.iter().sum();

        // Place cumulative boundaries so the last one lands exactly on the window
        let mut offsets = Vec::with_capacity(calls);
        let mut cumulative = 0.0;
        let mut previous = 0u128;
        for (i, weight) in weights.iter().enumerate() {
            cumulative += weight;
            let remaining = (calls - i - 1) as u128;
            let boundary = if remaining == 0 {
                span
            } else {
                let ideal = (span as f64 * (cumulative / total)) as u128;
                ideal.max(previous + 1).min(span - remaining)
            };
            offsets.push(from_nanos(boundary - previous));
            previous = boundary;
        }

        Self {
            window,
            offsets,
            cursor: 0,
        }
    }

    /// Create the schedule one of `instances` independent callers uses to share `limit`.
    ///
    /// Every caller gets a window of one second per instance, so all of them together issue
    /// [RateLimit::target] calls per second.
    ///
    /// # Panics
    ///
    /// Panics if `instances` is zero or if `limit` allows no calls after utilization.
    pub fn for_limit<R: Rng>(rng: &mut R, limit: RateLimit, instances: usize) -> Self {
        assert!(instances > 0, "instances must be positive");
        assert!(limit.target() > 0, "limit allows no calls after utilization");
        let window = Duration::from_secs(instances as u64);
        Self::new(rng, window, limit.target())
    }

    /// Returns the minimum wait before the next call, cycling through the schedule.
    pub fn next(&mut self) -> Duration {
        let offset = self.offsets[self.cursor];
        self.cursor = (self.cursor + 1) % self.offsets.len();
        offset
    }

    /// Returns the window one full cycle spans.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the number of calls per window.
    pub fn calls(&self) -> usize {
        self.offsets.len()
    }
}

fn from_nanos(nanos: u128) -> Duration {
    Duration::new(
        (nanos / NANOS_PER_SEC) as u64,
        (nanos % NANOS_PER_SEC) as u32,
    )
}
