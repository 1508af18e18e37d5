//! Keep the workers of one instance informed about the shards in its hash range.
//!
//! Every listing pass walks all pages of the stream's shards. Shards starting in the monitored
//! range are announced to their owning worker the first time they are seen. Once a pass completes,
//! shards not reported by any of its pages are announced as expired.

use super::{
    deadline,
    metrics::{self, Label},
};
use crate::{
    helper::shard_belongs_to_range, inflight::InFlight, queue, range::HashRange,
    tracker::ShardTracker, Client, ClientError, Error, Helper, ListShardsResponse,
};
use commonware_runtime::{Clock, Metrics};
use rand::Rng;
use std::time::SystemTime;
use tideline_utils::{RateBudget, RetryTracker};
use tracing::{debug, info, warn};

mod config;
pub use config::Config;

/// Periodically lists the stream's shards and announces changes in one hash range.
pub struct RangeMonitor<E: Clock + Rng + Metrics, C: Client> {
    context: E,
    helper: Helper<C>,
    range: HashRange,
    tracker: ShardTracker,
    queues: Vec<queue::Sender>,

    rate: RateBudget,
    retry: RetryTracker,
    next_call: SystemTime,

    listing: InFlight<Result<ListShardsResponse, ClientError>>,
    next_token: Option<String>,
    pass_start: SystemTime,
    halted: Option<Error>,

    metrics: metrics::Range,
}

impl<E: Clock + Rng + Metrics, C: Client> RangeMonitor<E, C> {
    /// Create a monitor announcing the shards of `range` to `queues` (one per local worker).
    ///
    /// # Panics
    ///
    /// Panics if `queues` is empty or `cfg.instances` is zero.
    pub fn new(
        mut context: E,
        cfg: Config,
        client: C,
        range: HashRange,
        queues: Vec<queue::Sender>,
    ) -> Self {
        assert!(!queues.is_empty(), "queues must not be empty");
        let rate = RateBudget::for_limit(&mut context, cfg.rate, cfg.instances);
        let metrics = metrics::Range::init(&context);
        let now = context.current();
        Self {
            helper: Helper::new(client, cfg.stream),
            tracker: ShardTracker::new(range, queues.len()),
            range,
            queues,

            rate,
            retry: RetryTracker::new(cfg.retry),
            next_call: now,

            listing: InFlight::new(),
            next_token: None,
            pass_start: now,
            halted: None,

            metrics,
            context,
        }
    }

    /// Returns the monitored hash range.
    pub fn range(&self) -> HashRange {
        self.range
    }

    /// Returns the number of shards currently tracked.
    pub fn tracked(&self) -> usize {
        self.tracker.len()
    }

    /// Seed a shard that a worker is already reading so it is never announced as added.
    ///
    /// The shard is still announced as expired once a completed pass no longer reports it.
    pub fn add_known_shard(&mut self, shard_id: impl Into<String>, starting_hash_key: u128) {
        let now = self.context.current();
        self.tracker
            .add_undetected(shard_id.into(), starting_hash_key, now);
        self.metrics.tracked.set(self.tracker.len() as i64);
    }

    /// Advance the monitor without blocking.
    ///
    /// Starts a listing if none is in flight and the rate budget allows one, otherwise processes
    /// the in-flight listing if it has completed. Returns an error once a listing fails for good;
    /// every later step returns the same error.
    pub fn run(&mut self) -> Result<(), Error> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }
        let now = self.context.current();
        if self.listing.is_idle() {
            self.start_listing(now);
            return Ok(());
        }
        let Some(result) = self.listing.check() else {
            return Ok(());
        };
        let result = match result {
            Ok(response) => {
                self.metrics.calls.get_or_create(&Label::success()).inc();
                self.process(now, response);
                Ok(())
            }
            Err(err) => {
                self.metrics.calls.get_or_create(&Label::failure()).inc();
                self.fail(now, err)
            }
        };
        if let Err(err) = &result {
            self.halted = Some(err.clone());
        }
        result
    }

    fn start_listing(&mut self, now: SystemTime) {
        if now < self.next_call {
            return;
        }
        if self.next_token.is_none() {
            self.pass_start = now;
            debug!(stream = self.helper.stream(), range = %self.range, "starting listing pass");
        }
        self.listing
            .start(self.helper.list_all_shards(self.next_token.clone()));
        self.next_call = deadline(now, self.rate.next());
    }

    fn process(&mut self, now: SystemTime, response: ListShardsResponse) {
        self.retry.reset();
        let range = self.range;
        let shards = response
            .shards
            .into_iter()
            .filter(|shard| shard_belongs_to_range(shard, &range));
        let added = self.tracker.mark_detections(shards, now);
        if !added.is_empty() {
            let ids: Vec<&str> = added.iter().map(|(shard, _)| shard.id.as_str()).collect();
            info!(stream = self.helper.stream(), shards = ?ids, "found new shards");
        }
        for (shard, owner) in added {
            self.queues[owner].add_added(shard);
            self.metrics.added.inc();
        }

        // Only a complete pass proves a shard is gone
        self.next_token = response.next_token;
        if self.next_token.is_none() {
            let expired = self.tracker.remove_expired_shards(self.pass_start);
            for (shard_id, owner) in expired {
                info!(stream = self.helper.stream(), shard = %shard_id, "shard expired");
                self.queues[owner].add_expired(shard_id);
                self.metrics.expired.inc();
            }
        }
        self.metrics.tracked.set(self.tracker.len() as i64);
    }

    fn fail(&mut self, now: SystemTime, err: ClientError) -> Result<(), Error> {
        // A failed page invalidates the pass, so the next listing starts over
        self.next_token = None;
        if !err.is_retryable() {
            warn!(stream = self.helper.stream(), ?err, "listing shards failed");
            return Err(Error::Client(err));
        }
        self.retry.attempt_failed();
        if !self.retry.should_try_again() {
            warn!(
                stream = self.helper.stream(),
                attempts = self.retry.attempts(),
                ?err,
                "listing shards failed, giving up"
            );
            return Err(Error::RetriesExhausted(err));
        }
        let wait = self.retry.next_wait();
        warn!(
            stream = self.helper.stream(),
            attempts = self.retry.attempts(),
            ?wait,
            ?err,
            "listing shards failed, retrying"
        );
        self.next_call = deadline(now, wait);
        Ok(())
    }
}
