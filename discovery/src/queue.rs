//! Deliver shard lifecycle events from a monitor to one worker.
//!
//! The queue is unbounded: the producer never waits for the consumer, and the consumer treats an
//! empty queue as "nothing to do right now".

use crate::Shard;
use futures::channel::mpsc;
use std::collections::VecDeque;
use tracing::debug;

/// A change in the set of shards a worker is responsible for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The worker should start reading the shard.
    Added(Shard),

    /// The shard with the given id no longer exists.
    Expired(String),
}

/// Create a connected producer and consumer.
pub fn new() -> (Sender, Receiver) {
    let (sender, receiver) = mpsc::unbounded();
    (
        Sender { sender },
        Receiver {
            receiver,
            added: VecDeque::new(),
            expired: VecDeque::new(),
            closed: false,
        },
    )
}

/// Producer half of a shard queue.
#[derive(Clone, Debug)]
pub struct Sender {
    sender: mpsc::UnboundedSender<Event>,
}

impl Sender {
    /// Enqueue a newly discovered shard.
    pub fn add_added(&self, shard: Shard) {
        self.send(Event::Added(shard));
    }

    /// Enqueue the id of an expired shard.
    pub fn add_expired(&self, shard_id: String) {
        self.send(Event::Expired(shard_id));
    }

    fn send(&self, event: Event) {
        if let Err(err) = self.sender.unbounded_send(event) {
            debug!(event = ?err.into_inner(), "receiver dropped");
        }
    }
}

/// Consumer half of a shard queue.
///
/// Events of the same kind are returned in the order they were sent.
#[derive(Debug)]
pub struct Receiver {
    receiver: mpsc::UnboundedReceiver<Event>,
    added: VecDeque<Shard>,
    expired: VecDeque<String>,
    closed: bool,
}

impl Receiver {
    /// Returns the next added shard, if any.
    pub fn poll_added(&mut self) -> Option<Shard> {
        self.drain();
        self.added.pop_front()
    }

    /// Returns the id of the next expired shard, if any.
    pub fn poll_expired(&mut self) -> Option<String> {
        self.drain();
        self.expired.pop_front()
    }

    /// Returns whether the producer is gone and every event has been consumed.
    pub fn is_closed(&mut self) -> bool {
        self.drain();
        self.closed && self.added.is_empty() && self.expired.is_empty()
    }

    /// Move every delivered event into the per-kind buffers without waiting.
    fn drain(&mut self) {
        while !self.closed {
            match self.receiver.try_next() {
                Ok(Some(Event::Added(shard))) => self.added.push_back(shard),
                Ok(Some(Event::Expired(id))) => self.expired.push_back(id),
                Ok(None) => self.closed = true,
                Err(_) => break,
            }
        }
    }
}
