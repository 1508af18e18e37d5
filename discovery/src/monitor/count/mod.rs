//! Track the number of open shards in a stream.
//!
//! Only one instance needs to poll the count. The others hold a passive monitor (see
//! [ShardCountMonitor::noop]) that never calls the service and reads the same shared value.

use super::{
    deadline,
    metrics::{self, Label},
};
use crate::{inflight::InFlight, Client, ClientError, Error, Helper, StreamSummary};
use commonware_runtime::{Clock, Metrics};
use rand::Rng;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::SystemTime,
};
use tideline_utils::{RateBudget, RetryTracker};
use tracing::{debug, info, warn};

mod config;
pub use config::Config;

struct Active<E: Clock + Rng + Metrics, C: Client> {
    context: E,
    helper: Helper<C>,

    rate: RateBudget,
    retry: RetryTracker,
    next_call: SystemTime,

    describing: InFlight<Result<StreamSummary, ClientError>>,
    halted: Option<Error>,

    metrics: metrics::Count,
}

impl<E: Clock + Rng + Metrics, C: Client> Active<E, C> {
    fn run(&mut self, count: &AtomicUsize) -> Result<(), Error> {
        if let Some(err) = &self.halted {
            return Err(err.clone());
        }
        let now = self.context.current();
        if self.describing.is_idle() {
            if now >= self.next_call {
                debug!(stream = self.helper.stream(), "describing stream");
                self.describing.start(self.helper.describe_stream_summary());
                self.next_call = deadline(now, self.rate.next());
            }
            return Ok(());
        }
        let Some(result) = self.describing.check() else {
            return Ok(());
        };
        let result = match result {
            Ok(summary) => {
                self.metrics.calls.get_or_create(&Label::success()).inc();
                self.retry.reset();
                self.update(count, summary);
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

    fn update(&mut self, count: &AtomicUsize, summary: StreamSummary) {
        let Some(current) = summary.open_shard_count else {
            return;
        };
        let current = current as usize;
        let previous = count.swap(current, Ordering::Relaxed);
        if previous != current {
            info!(
                stream = self.helper.stream(),
                previous, current, "updated shard count"
            );
        }
        self.metrics.shards.set(current as i64);
    }

    fn fail(&mut self, now: SystemTime, err: ClientError) -> Result<(), Error> {
        if !err.is_retryable() {
            warn!(stream = self.helper.stream(), ?err, "describing stream failed");
            return Err(Error::Client(err));
        }
        self.retry.attempt_failed();
        if !self.retry.should_try_again() {
            warn!(
                stream = self.helper.stream(),
                attempts = self.retry.attempts(),
                ?err,
                "describing stream failed, giving up"
            );
            return Err(Error::RetriesExhausted(err));
        }
        let wait = self.retry.next_wait();
        warn!(
            stream = self.helper.stream(),
            attempts = self.retry.attempts(),
            ?wait,
            ?err,
            "describing stream failed, retrying"
        );
        self.next_call = deadline(now, wait);
        Ok(())
    }
}

enum Mode<E: Clock + Rng + Metrics, C: Client> {
    Active(Box<Active<E, C>>),
    Passive,
}

/// Periodically describes the stream and publishes its open shard count.
pub struct ShardCountMonitor<E: Clock + Rng + Metrics, C: Client> {
    count: Arc<AtomicUsize>,
    mode: Mode<E, C>,
}

impl<E: Clock + Rng + Metrics, C: Client> ShardCountMonitor<E, C> {
    /// Create a monitor that polls the service.
    ///
    /// # Panics
    ///
    /// Panics if `cfg.instances` is zero.
    pub fn new(mut context: E, cfg: Config, client: C) -> Self {
        let rate = RateBudget::for_limit(&mut context, cfg.rate, cfg.instances);
        let metrics = metrics::Count::init(&context);
        let next_call = context.current();
        let active = Active {
            helper: Helper::new(client, cfg.stream),
            rate,
            retry: RetryTracker::new(cfg.retry),
            next_call,
            describing: InFlight::new(),
            halted: None,
            metrics,
            context,
        };
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            mode: Mode::Active(Box::new(active)),
        }
    }

    /// Returns a monitor that never calls the service and reports the same count as `self`.
    pub fn noop(&self) -> Self {
        Self {
            count: self.count.clone(),
            mode: Mode::Passive,
        }
    }

    /// Returns whether the monitor polls the service.
    pub fn is_active(&self) -> bool {
        matches!(self.mode, Mode::Active(_))
    }

    /// Returns the last observed number of open shards (zero until the first description).
    pub fn shard_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Advance the monitor without blocking.
    ///
    /// Passive monitors do nothing. Active monitors behave like
    /// [super::range::RangeMonitor::run]: they start a description when the rate budget allows and
    /// otherwise process the one in flight.
    pub fn run(&mut self) -> Result<(), Error> {
        match &mut self.mode {
            Mode::Active(active) => active.run(&self.count),
            Mode::Passive => Ok(()),
        }
    }
}
