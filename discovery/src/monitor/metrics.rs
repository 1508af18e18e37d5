//! Metrics recorded by the monitors.

use commonware_runtime::Metrics as RuntimeMetrics;
use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family, gauge::Gauge},
};

/// Metric label that indicates how a call completed.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct Label {
    status: Status,
}

impl Label {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
        }
    }

    pub fn failure() -> Self {
        Self {
            status: Status::Failure,
        }
    }
}

/// Outcome of a call.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Status {
    /// The service responded.
    Success,
    /// The call failed (retried or not).
    Failure,
}

/// Metrics for the [super::range::RangeMonitor].
#[derive(Default)]
pub struct Range {
    /// Number of shard listings by status
    pub calls: Family<Label, Counter>,
    /// Number of shards announced as added
    pub added: Counter,
    /// Number of shards announced as expired
    pub expired: Counter,
    /// Current number of tracked shards
    pub tracked: Gauge,
}

impl Range {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: &E) -> Self {
        let metrics = Self::default();
        context.register(
            "calls",
            "Number of shard listings by status",
            metrics.calls.clone(),
        );
        context.register(
            "shards_added",
            "Number of shards announced as added",
            metrics.added.clone(),
        );
        context.register(
            "shards_expired",
            "Number of shards announced as expired",
            metrics.expired.clone(),
        );
        context.register(
            "tracked_shards",
            "Current number of tracked shards",
            metrics.tracked.clone(),
        );
        metrics
    }
}

/// Metrics for the [super::count::ShardCountMonitor].
#[derive(Default)]
pub struct Count {
    /// Number of stream descriptions by status
    pub calls: Family<Label, Counter>,
    /// Last observed number of open shards
    pub shards: Gauge,
}

impl Count {
    /// Create and return a new set of metrics, registered with the given context.
    pub fn init<E: RuntimeMetrics>(context: &E) -> Self {
        let metrics = Self::default();
        context.register(
            "calls",
            "Number of stream descriptions by status",
            metrics.calls.clone(),
        );
        context.register(
            "shard_count",
            "Last observed number of open shards",
            metrics.shards.clone(),
        );
        metrics
    }
}
