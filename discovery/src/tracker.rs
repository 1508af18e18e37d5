//! Track the lifecycle of the shards in one hash range.

use crate::{range::HashRange, Shard};
use std::{
    collections::{HashMap, HashSet},
    time::SystemTime,
};

/// A shard known to belong to the tracked range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedShard {
    /// Identifier of the shard.
    pub id: String,

    /// Lowest hash key routed to the shard.
    pub starting_hash_key: u128,

    /// When the shard was first seen (or seeded).
    pub first_detected: SystemTime,

    /// When the shard was last reported by a listing (or seeded).
    pub last_detected: SystemTime,

    /// Local worker slot responsible for the shard.
    pub owner: usize,
}

/// Holds the shards of one hash range and decides when they appear and disappear.
///
/// A shard is reported as added at most once. It is reported as expired at most once and only
/// after it was added or seeded. Ids of expired shards are remembered so a stale listing can
/// never bring a retired shard back.
///
/// Retired ids are never pruned, since a stale listing may report an expired shard at any later
/// time and a forgotten id would be announced again. The set grows by one id per expired shard for
/// the life of the tracker.
pub struct ShardTracker {
    range: HashRange,
    slots: usize,
    next_owner: usize,

    shards: HashMap<String, TrackedShard>,
    retired: HashSet<String>,
}

impl ShardTracker {
    /// Create a tracker for `range` whose shards are spread over `slots` local workers.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is zero.
    pub fn new(range: HashRange, slots: usize) -> Self {
        assert!(slots > 0, "slots must be positive");
        Self {
            range,
            slots,
            next_owner: 0,
            shards: HashMap::new(),
            retired: HashSet::new(),
        }
    }

    /// Record that `shards` were reported at `now`.
    ///
    /// Returns the shards seen for the first time, in the order they were reported, each with the
    /// slot it was assigned to. Slots are handed out round-robin and never rebalanced.
    pub fn mark_detections(
        &mut self,
        shards: impl IntoIterator<Item = Shard>,
        now: SystemTime,
    ) -> Vec<(Shard, usize)> {
        let mut added = Vec::new();
        for shard in shards {
            if let Some(tracked) = self.shards.get_mut(&shard.id) {
                tracked.last_detected = now;
                continue;
            }
            if self.retired.contains(&shard.id) {
                continue;
            }
            let owner = self.next_owner;
            self.next_owner = (self.next_owner + 1) % self.slots;
            self.shards.insert(
                shard.id.clone(),
                TrackedShard {
                    id: shard.id.clone(),
                    starting_hash_key: shard.starting_hash_key,
                    first_detected: now,
                    last_detected: now,
                    owner,
                },
            );
            added.push((shard, owner));
        }
        added
    }

    /// Remove every shard not detected since `pass_start`.
    ///
    /// Must only be called once a complete listing pass (every page) has been processed. Returns
    /// the ids of the removed shards with their slots, ordered by id.
    pub fn remove_expired_shards(&mut self, pass_start: SystemTime) -> Vec<(String, usize)> {
        let mut expired: Vec<(String, usize)> = self
            .shards
            .values()
            .filter(|tracked| tracked.last_detected < pass_start)
            .map(|tracked| (tracked.id.clone(), tracked.owner))
            .collect();
        expired.sort();
        for (id, _) in &expired {
            self.shards.remove(id);
            self.retired.insert(id.clone());
        }
        expired
    }

    /// Seed a shard that is already being handled elsewhere, without reporting it as added.
    ///
    /// The shard is assigned to the slot whose share of the tracked range holds
    /// `starting_hash_key` (round-robin if the key lies outside the range). Seeding a shard that
    /// is already tracked or was retired has no effect.
    pub fn add_undetected(&mut self, id: String, starting_hash_key: u128, now: SystemTime) {
        if self.shards.contains_key(&id) || self.retired.contains(&id) {
            return;
        }
        let owner = match self.range.part_of(self.slots, starting_hash_key) {
            Some(owner) => owner,
            None => {
                let owner = self.next_owner;
                self.next_owner = (self.next_owner + 1) % self.slots;
                owner
            }
        };
        self.shards.insert(
            id.clone(),
            TrackedShard {
                id,
                starting_hash_key,
                first_detected: now,
                last_detected: now,
                owner,
            },
        );
    }

    /// Returns the tracked shard with the given id.
    pub fn get(&self, id: &str) -> Option<&TrackedShard> {
        self.shards.get(id)
    }

    /// Returns the number of tracked shards.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Returns whether no shards are tracked.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}
