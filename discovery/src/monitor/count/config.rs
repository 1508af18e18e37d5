use tideline_utils::{RateLimit, RetryPolicy};

/// Configuration for the [`ShardCountMonitor`](super::ShardCountMonitor).
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the stream to monitor.
    pub stream: String,

    /// Number of instances sharing the stream (and its control-plane limits).
    pub instances: usize,

    /// How failed descriptions are retried.
    pub retry: RetryPolicy,

    /// Service limit on stream descriptions.
    pub rate: RateLimit,
}

impl Config {
    /// Configuration with the default retry policy and description limit.
    pub fn new(stream: impl Into<String>, instances: usize) -> Self {
        Self {
            stream: stream.into(),
            instances,
            retry: RetryPolicy::default(),
            rate: RateLimit::DESCRIBE_STREAM_SUMMARY,
        }
    }
}
