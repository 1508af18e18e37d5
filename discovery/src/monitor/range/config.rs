use tideline_utils::{RateLimit, RetryPolicy};

/// Configuration for the [`RangeMonitor`](super::RangeMonitor).
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the stream to monitor.
    pub stream: String,

    /// Number of instances sharing the stream (and its control-plane limits).
    pub instances: usize,

    /// How failed listings are retried.
    pub retry: RetryPolicy,

    /// Service limit on shard listings.
    pub rate: RateLimit,
}

impl Config {
    /// Configuration with the default retry policy and listing limit.
    pub fn new(stream: impl Into<String>, instances: usize) -> Self {
        Self {
            stream: stream.into(),
            instances,
            retry: RetryPolicy::default(),
            rate: RateLimit::LIST_SHARDS,
        }
    }
}
