//! Values exchanged with the stream's control plane.

use bytes::Bytes;
use std::time::SystemTime;
use thiserror::Error;

/// Immutable description of a shard, as reported by a listing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shard {
    /// Unique identifier of the shard within its stream.
    pub id: String,

    /// Lowest hash key routed to the shard.
    pub starting_hash_key: u128,

    /// Highest hash key routed to the shard.
    pub ending_hash_key: u128,

    /// Sequence number of the first record ever written to the shard.
    pub starting_sequence_number: String,

    /// Sequence number of the last record, set once the shard has been closed by a reshard.
    pub ending_sequence_number: Option<String>,
}

impl Shard {
    /// Returns whether the shard still accepts writes.
    pub fn is_open(&self) -> bool {
        self.ending_sequence_number.is_none()
    }
}

/// Restricts which shards a listing returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShardFilter {
    /// Shards open at the trim horizon.
    AtTrimHorizon,

    /// Every shard within the retention period, open or closed.
    FromTrimHorizon,

    /// Only shards currently open.
    AtLatest,
}

/// One page of a shard listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListShardsResponse {
    /// Shards on this page.
    pub shards: Vec<Shard>,

    /// Token to request the next page with (`None` on the last page).
    pub next_token: Option<String>,
}

/// Summary of a stream description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of open shards, if reported.
    pub open_shard_count: Option<u32>,
}

/// A record read from a shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// Position of the record within its shard.
    pub sequence_number: String,

    /// Key that routed the record to its shard.
    pub partition_key: String,

    /// Time the record was accepted by the stream.
    pub arrival: SystemTime,

    /// Payload of the record.
    pub data: Bytes,
}

/// Failures reported by a [crate::Client].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("throttled: {0}")]
    Throttled(String),
    #[error("next token expired: {0}")]
    ExpiredNextToken(String),
    #[error("resource in use: {0}")]
    ResourceInUse(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("call canceled")]
    Canceled,
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Returns whether the failure is transient and the call may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Throttled(_)
                | Self::ExpiredNextToken(_)
                | Self::ResourceInUse(_)
                | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_status() {
        let mut shard = Shard {
            id: "shardId-000000000000".into(),
            starting_hash_key: 0,
            ending_hash_key: u128::MAX,
            starting_sequence_number: "1".into(),
            ending_sequence_number: None,
        };
        assert!(shard.is_open());
        shard.ending_sequence_number = Some("2".into());
        assert!(!shard.is_open());
    }

    #[test]
    fn test_retryable() {
        assert!(ClientError::Throttled("limit".into()).is_retryable());
        assert!(ClientError::ExpiredNextToken("token".into()).is_retryable());
        assert!(ClientError::ResourceInUse("updating".into()).is_retryable());
        assert!(ClientError::Transport("reset".into()).is_retryable());
        assert!(!ClientError::ResourceNotFound("stream".into()).is_retryable());
        assert!(!ClientError::InvalidArgument("token".into()).is_retryable());
        assert!(!ClientError::Canceled.is_retryable());
        assert!(!ClientError::Unexpected("status 418".into()).is_retryable());
    }
}
