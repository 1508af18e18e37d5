//! Discover and partition the shards of a resharding stream across independent consumers.
//!
//! # Overview
//!
//! A stream is split into shards, each owning a contiguous slice of the hash key space. Shards
//! are split and merged over time, so the set of shards a consumer must read is never fixed.
//! This crate keeps every consumer instance informed about the shards it is responsible for
//! without any coordination between instances:
//!
//! - [range] divides the key space into one contiguous range per instance. Every instance computes
//!   the same ranges and reads exactly the shards whose starting hash key falls in its own.
//! - [monitor::range::RangeMonitor] periodically lists the stream's shards, tracks the ones in its
//!   range with a [tracker::ShardTracker], and announces added and expired shards to local workers
//!   over [queue]s.
//! - [monitor::count::ShardCountMonitor] periodically polls the number of open shards.
//! - [iterators::InitialShardIterators] decides where a worker starts reading a new shard.
//!
//! # Execution Model
//!
//! Monitors never block. The host repeatedly calls `run`, which either starts a call (when the
//! monitor's [tideline_utils::RateBudget] allows one) or checks whether the call already in flight
//! has completed. Calls are issued through a [Client] and polled, never awaited.
//!
//! Control-plane limits are shared by every instance, so each monitor paces its calls with a
//! randomized schedule sized to its share of the limit and retries transient failures with a
//! bounded [tideline_utils::RetryTracker]. Once retries are exhausted, `run` returns an error and
//! the monitor should be discarded.

use std::future::Future;
use thiserror::Error;

pub mod helper;
pub use helper::Helper;
mod inflight;
pub mod iterators;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod monitor;
pub mod queue;
pub mod range;
pub mod tracker;
mod types;
pub use types::{ClientError, ListShardsResponse, Record, Shard, ShardFilter, StreamSummary};

use iterators::{IteratorType, ShardIteratorRequest};

/// Errors that can occur when discovering shards.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("retries exhausted: {0}")]
    RetriesExhausted(ClientError),
    #[error("client failure: {0}")]
    Client(ClientError),
    #[error("interrupted while waiting for results")]
    Interrupted,
    #[error("invalid shard id pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("unknown iterator type: {0}")]
    UnknownIteratorType(String),
    #[error("missing starting position for {0}")]
    MissingPosition(IteratorType),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Interface to the control and data plane of the stream service.
///
/// Every call returns immediately with a future that resolves once the service responds.
/// Futures must not borrow the client so they can be held across monitor steps.
pub trait Client: Clone + Send + 'static {
    /// List one page of the stream's shards, continuing from `next_token` if provided.
    fn list_shards(
        &self,
        stream: &str,
        next_token: Option<String>,
        filter: ShardFilter,
    ) -> impl Future<Output = Result<ListShardsResponse, ClientError>> + Send + 'static;

    /// Describe the stream's current size.
    fn describe_stream_summary(
        &self,
        stream: &str,
    ) -> impl Future<Output = Result<StreamSummary, ClientError>> + Send + 'static;

    /// Obtain an iterator token to read a shard from the requested position.
    fn get_shard_iterator(
        &self,
        request: ShardIteratorRequest,
    ) -> impl Future<Output = Result<String, ClientError>> + Send + 'static;

    /// Read the records available at `iterator`, returning them with the next iterator (if the
    /// shard is still readable).
    fn get_records(
        &self,
        iterator: String,
    ) -> impl Future<Output = Result<(Vec<Record>, Option<String>), ClientError>> + Send + 'static;
}
