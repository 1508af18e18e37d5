//! Divide the hash key space into contiguous ranges.
//!
//! Every consumer instance computes the same partitioning from the same inputs, so instances
//! agree on which shards each of them owns without ever communicating.

use std::fmt;

/// An inclusive interval `[start, end]` of hash keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashRange {
    start: u128,
    end: u128,
}

impl HashRange {
    /// Every possible hash key.
    pub const FULL: Self = Self {
        start: 0,
        end: u128::MAX,
    };

    /// Create a range from `start` to `end` (both inclusive).
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn new(start: u128, end: u128) -> Self {
        assert!(start <= end, "range start must not exceed its end");
        Self { start, end }
    }

    /// Returns the first key in the range.
    pub fn start(&self) -> u128 {
        self.start
    }

    /// Returns the last key in the range.
    pub fn end(&self) -> u128 {
        self.end
    }

    /// Returns whether `key` falls in the range.
    pub fn contains(&self, key: u128) -> bool {
        self.start <= key && key <= self.end
    }

    /// Split the range into `parts` contiguous blocks of near-equal width.
    ///
    /// Blocks are ordered by key. When the width does not divide evenly, the earliest blocks are
    /// one key wider than the rest.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is zero or larger than the number of keys in the range.
    pub fn split(&self, parts: usize) -> Vec<HashRange> {
        (0..parts).map(|index| self.part(parts, index)).collect()
    }

    /// Returns block `index` of [HashRange::split] without computing the others.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is zero, larger than the number of keys in the range, or if `index` is
    /// not smaller than `parts`.
    pub fn part(&self, parts: usize, index: usize) -> HashRange {
        assert!(parts > 0, "parts must be positive");
        assert!(index < parts, "index must be smaller than parts");
        let parts = parts as u128;
        let index = index as u128;

        // The range holds `span + 1` keys, which may not fit in a u128. Derive the block width
        // (minus one, so it always fits) and the number of wider blocks from `span` instead.
        let span = self.end - self.start;
        let (quotient, remainder) = (span / parts, span % parts);
        let (width, wider) = if remainder + 1 == parts {
            (quotient, 0)
        } else {
            assert!(quotient > 0, "parts must not exceed keys in range");
            (quotient - 1, remainder + 1)
        };

        let offset = index * width + index + index.min(wider);
        let start = self.start + offset;
        let end = start + width + u128::from(index < wider);
        Self { start, end }
    }

    /// Returns the index of the block of [HashRange::split] that holds `key`, if any.
    pub fn part_of(&self, parts: usize, key: u128) -> Option<usize> {
        if !self.contains(key) {
            return None;
        }
        (0..parts).find(|index| self.part(parts, *index).contains(key))
    }
}

impl fmt::Display for HashRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Returns the range of the full key space assigned to instance `index` of `instances`.
///
/// # Panics
///
/// Panics if `instances` is zero or `index` is not smaller than `instances`.
pub fn range_for(instances: usize, index: usize) -> HashRange {
    HashRange::FULL.part(instances, index)
}
