//! Decide where reading starts in a shard seen for the first time.
//!
//! Rules are evaluated in the order they were added and the first rule whose pattern matches the
//! whole shard id wins. The resolver never reorders rules, so callers must add specific rules
//! before general ones. Shards matched by no rule are read from their first sequence number.

use crate::{Error, Shard};
use regex::Regex;
use std::{
    fmt,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Where a shard iterator starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IteratorType {
    /// At the record with the given sequence number.
    AtSequenceNumber,
    /// Right after the record with the given sequence number.
    AfterSequenceNumber,
    /// At the oldest record still retained.
    TrimHorizon,
    /// After the most recent record (only new records are read).
    Latest,
    /// At the first record written at or after the given timestamp.
    AtTimestamp,
}

impl IteratorType {
    /// Returns the wire name of the iterator type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtSequenceNumber => "AT_SEQUENCE_NUMBER",
            Self::AfterSequenceNumber => "AFTER_SEQUENCE_NUMBER",
            Self::TrimHorizon => "TRIM_HORIZON",
            Self::Latest => "LATEST",
            Self::AtTimestamp => "AT_TIMESTAMP",
        }
    }
}

impl fmt::Display for IteratorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IteratorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AT_SEQUENCE_NUMBER" => Ok(Self::AtSequenceNumber),
            "AFTER_SEQUENCE_NUMBER" => Ok(Self::AfterSequenceNumber),
            "TRIM_HORIZON" => Ok(Self::TrimHorizon),
            "LATEST" => Ok(Self::Latest),
            "AT_TIMESTAMP" => Ok(Self::AtTimestamp),
            _ => Err(Error::UnknownIteratorType(s.to_string())),
        }
    }
}

/// Everything needed to obtain a shard iterator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardIteratorRequest {
    pub stream: String,
    pub shard_id: String,
    pub iterator_type: IteratorType,
    pub starting_sequence_number: Option<String>,
    pub timestamp: Option<SystemTime>,
}

/// Starting position of a rule, validated against its iterator type.
#[derive(Clone, Debug)]
enum Position {
    None,
    Sequence(String),
    Timestamp(SystemTime),
}

#[derive(Clone, Debug)]
struct Rule {
    pattern: Regex,
    iterator_type: IteratorType,
    position: Position,
}

/// Ordered rules mapping shard ids to initial iterators.
#[derive(Clone, Debug, Default)]
pub struct InitialShardIterators {
    rules: Vec<Rule>,
}

impl InitialShardIterators {
    /// Create a resolver with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule applying `iterator_type` to shards whose id fully matches `pattern`.
    ///
    /// `position` must hold a sequence number for [IteratorType::AtSequenceNumber] and
    /// [IteratorType::AfterSequenceNumber], and milliseconds since the epoch for
    /// [IteratorType::AtTimestamp]. It is ignored for other types.
    pub fn add(
        &mut self,
        pattern: &str,
        iterator_type: IteratorType,
        position: Option<&str>,
    ) -> Result<(), Error> {
        let pattern = Regex::new(&format!("^(?:{pattern})$"))?;
        let position = match iterator_type {
            IteratorType::AtSequenceNumber | IteratorType::AfterSequenceNumber => {
                let sequence = position.ok_or(Error::MissingPosition(iterator_type))?;
                Position::Sequence(sequence.to_string())
            }
            IteratorType::AtTimestamp => {
                let millis = position.ok_or(Error::MissingPosition(iterator_type))?;
                let millis: u64 = millis
                    .parse()
                    .map_err(|_| Error::InvalidTimestamp(millis.to_string()))?;
                Position::Timestamp(UNIX_EPOCH + Duration::from_millis(millis))
            }
            IteratorType::TrimHorizon | IteratorType::Latest => Position::None,
        };
        self.rules.push(Rule {
            pattern,
            iterator_type,
            position,
        });
        Ok(())
    }

    /// Returns the iterator request for the first time `shard` of `stream` is read.
    pub fn request(&self, stream: &str, shard: &Shard) -> ShardIteratorRequest {
        let mut request = ShardIteratorRequest {
            stream: stream.to_string(),
            shard_id: shard.id.clone(),
            iterator_type: IteratorType::AtSequenceNumber,
            starting_sequence_number: Some(shard.starting_sequence_number.clone()),
            timestamp: None,
        };
        let Some(rule) = self.rules.iter().find(|rule| rule.pattern.is_match(&shard.id)) else {
            return request;
        };
        request.iterator_type = rule.iterator_type;
        request.starting_sequence_number = None;
        match &rule.position {
            Position::None => {}
            Position::Sequence(sequence) => {
                request.starting_sequence_number = Some(sequence.clone());
            }
            Position::Timestamp(timestamp) => request.timestamp = Some(*timestamp),
        }
        request
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether no rules were added.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "stream";

    fn shard(id: &str, starting_hash_key: u128, ending_hash_key: u128) -> Shard {
        Shard {
            id: id.into(),
            starting_hash_key,
            ending_hash_key,
            starting_sequence_number: starting_hash_key.to_string(),
            ending_sequence_number: Some(ending_hash_key.to_string()),
        }
    }

    fn shards() -> [Shard; 4] {
        [
            shard("shard0", 0, 500),
            shard("shard1", 500, 1_000),
            shard("shard2", 1_000, 1_500),
            shard("shard3", 1_500, 2_000),
        ]
    }

    fn expected(
        shard: &Shard,
        iterator_type: IteratorType,
        starting_sequence_number: Option<&str>,
    ) -> ShardIteratorRequest {
        ShardIteratorRequest {
            stream: STREAM.into(),
            shard_id: shard.id.clone(),
            iterator_type,
            starting_sequence_number: starting_sequence_number.map(String::from),
            timestamp: None,
        }
    }

    #[test]
    fn test_unspecified() {
        let [_, _, _, shard3] = shards();
        let iterators = InitialShardIterators::new();
        assert_eq!(
            iterators.request(STREAM, &shard3),
            expected(&shard3, IteratorType::AtSequenceNumber, Some("1500"))
        );
    }

    #[test]
    fn test_latest() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators.add(".*", IteratorType::Latest, None).unwrap();
        assert_eq!(
            iterators.request(STREAM, &shard0),
            expected(&shard0, IteratorType::Latest, None)
        );
    }

    #[test]
    fn test_oldest() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators.add(".*", IteratorType::TrimHorizon, Some("ignored")).unwrap();
        assert_eq!(
            iterators.request(STREAM, &shard0),
            expected(&shard0, IteratorType::TrimHorizon, None)
        );
    }

    #[test]
    fn test_timestamp() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators
            .add(".*", IteratorType::AtTimestamp, Some("1600000000123"))
            .unwrap();
        let mut want = expected(&shard0, IteratorType::AtTimestamp, None);
        want.timestamp = Some(UNIX_EPOCH + Duration::from_millis(1_600_000_000_123));
        assert_eq!(iterators.request(STREAM, &shard0), want);
    }

    #[test]
    fn test_at_sequence() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators
            .add(".*", IteratorType::AtSequenceNumber, Some("12345"))
            .unwrap();
        assert_eq!(
            iterators.request(STREAM, &shard0),
            expected(&shard0, IteratorType::AtSequenceNumber, Some("12345"))
        );
    }

    #[test]
    fn test_after_sequence() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators
            .add(".*", IteratorType::AfterSequenceNumber, Some("12345"))
            .unwrap();
        assert_eq!(
            iterators.request(STREAM, &shard0),
            expected(&shard0, IteratorType::AfterSequenceNumber, Some("12345"))
        );
    }

    #[test]
    fn test_sequential_check() {
        let [_, shard1, shard2, shard3] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators.add(&shard1.id, IteratorType::Latest, None).unwrap();
        iterators.add(&shard3.id, IteratorType::TrimHorizon, None).unwrap();
        iterators
            .add(".*", IteratorType::AtSequenceNumber, Some("9999"))
            .unwrap();

        // Matches the last rule
        assert_eq!(
            iterators.request(STREAM, &shard2),
            expected(&shard2, IteratorType::AtSequenceNumber, Some("9999"))
        );

        // Matches the first rule
        assert_eq!(
            iterators.request(STREAM, &shard1),
            expected(&shard1, IteratorType::Latest, None)
        );
    }

    #[test]
    fn test_first_match_wins() {
        let [shard0, ..] = shards();
        let mut general_first = InitialShardIterators::new();
        general_first.add(".*", IteratorType::Latest, None).unwrap();
        general_first.add("shard0", IteratorType::TrimHorizon, None).unwrap();
        assert_eq!(
            general_first.request(STREAM, &shard0).iterator_type,
            IteratorType::Latest
        );

        let mut specific_first = InitialShardIterators::new();
        specific_first.add("shard0", IteratorType::TrimHorizon, None).unwrap();
        specific_first.add(".*", IteratorType::Latest, None).unwrap();
        assert_eq!(
            specific_first.request(STREAM, &shard0).iterator_type,
            IteratorType::TrimHorizon
        );
    }

    #[test]
    fn test_pattern_matches_whole_id() {
        let [shard0, ..] = shards();
        let mut iterators = InitialShardIterators::new();
        iterators.add("shard", IteratorType::Latest, None).unwrap();
        assert_eq!(
            iterators.request(STREAM, &shard0).iterator_type,
            IteratorType::AtSequenceNumber
        );
    }

    #[test]
    fn test_invalid_rules() {
        let mut iterators = InitialShardIterators::new();
        assert!(matches!(
            iterators.add("(", IteratorType::Latest, None),
            Err(Error::InvalidPattern(_))
        ));
        assert!(matches!(
            iterators.add(".*", IteratorType::AfterSequenceNumber, None),
            Err(Error::MissingPosition(IteratorType::AfterSequenceNumber))
        ));
        assert!(matches!(
            iterators.add(".*", IteratorType::AtTimestamp, Some("yesterday")),
            Err(Error::InvalidTimestamp(_))
        ));
        assert!(iterators.is_empty());
    }

    #[test]
    fn test_parse_iterator_type() {
        for iterator_type in [
            IteratorType::AtSequenceNumber,
            IteratorType::AfterSequenceNumber,
            IteratorType::TrimHorizon,
            IteratorType::Latest,
            IteratorType::AtTimestamp,
        ] {
            assert_eq!(iterator_type.as_str().parse::<IteratorType>().unwrap(), iterator_type);
        }
        assert!(matches!(
            "OLDEST".parse::<IteratorType>(),
            Err(Error::UnknownIteratorType(_))
        ));
    }
}
