//! Mock implementation of the stream service.
//!
//! Responses are scripted by the test and handed out in order. A call with no scripted response
//! stays pending forever, like a service that never answers.

use crate::{
    iterators::ShardIteratorRequest, ClientError, ListShardsResponse, Record, ShardFilter,
    StreamSummary,
};
use futures::{
    channel::oneshot,
    future::{self, BoxFuture},
    Future, FutureExt,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

type Records = (Vec<Record>, Option<String>);

/// A response that is either available immediately or delivered later by the test.
enum Scripted<T> {
    Ready(Result<T, ClientError>),
    Gated(oneshot::Receiver<Result<T, ClientError>>),
}

impl<T: Send + 'static> Scripted<T> {
    fn into_future(self) -> BoxFuture<'static, Result<T, ClientError>> {
        match self {
            Self::Ready(result) => future::ready(result).boxed(),
            Self::Gated(receiver) => receiver
                .map(|result| result.unwrap_or(Err(ClientError::Canceled)))
                .boxed(),
        }
    }
}

fn next<T: Send + 'static>(
    scripted: &mut VecDeque<Scripted<T>>,
) -> BoxFuture<'static, Result<T, ClientError>> {
    match scripted.pop_front() {
        Some(scripted) => scripted.into_future(),
        None => future::pending().boxed(),
    }
}

#[derive(Default)]
struct State {
    listings: VecDeque<Scripted<ListShardsResponse>>,
    summaries: VecDeque<Scripted<StreamSummary>>,
    records: HashMap<String, Records>,

    list_requests: Vec<(String, Option<String>, ShardFilter)>,
    describe_requests: Vec<String>,
    iterator_requests: Vec<ShardIteratorRequest>,
}

/// Scripted stream service that records every request it receives.
#[derive(Clone, Default)]
pub struct Client {
    state: Arc<Mutex<State>>,
}

impl Client {
    /// Create a client with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of the next unscripted listing.
    pub fn push_listing(&self, result: Result<ListShardsResponse, ClientError>) {
        let mut state = self.state.lock().unwrap();
        state.listings.push_back(Scripted::Ready(result));
    }

    /// Script a listing whose result is delivered through the returned sender.
    ///
    /// Dropping the sender fails the listing with [ClientError::Canceled].
    pub fn gate_listing(&self) -> oneshot::Sender<Result<ListShardsResponse, ClientError>> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.state.lock().unwrap();
        state.listings.push_back(Scripted::Gated(receiver));
        sender
    }

    /// Script the result of the next unscripted stream description.
    pub fn push_summary(&self, result: Result<StreamSummary, ClientError>) {
        let mut state = self.state.lock().unwrap();
        state.summaries.push_back(Scripted::Ready(result));
    }

    /// Serve `records` (and `next`) to readers of `iterator`.
    pub fn push_records(&self, iterator: &str, records: Vec<Record>, next: Option<String>) {
        let mut state = self.state.lock().unwrap();
        state.records.insert(iterator.to_string(), (records, next));
    }

    /// Returns every listing request received, as `(stream, next_token, filter)`.
    pub fn list_requests(&self) -> Vec<(String, Option<String>, ShardFilter)> {
        self.state.lock().unwrap().list_requests.clone()
    }

    /// Returns the stream of every description request received.
    pub fn describe_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().describe_requests.clone()
    }

    /// Returns every iterator request received.
    pub fn iterator_requests(&self) -> Vec<ShardIteratorRequest> {
        self.state.lock().unwrap().iterator_requests.clone()
    }
}

impl crate::Client for Client {
    fn list_shards(
        &self,
        stream: &str,
        next_token: Option<String>,
        filter: ShardFilter,
    ) -> impl Future<Output = Result<ListShardsResponse, ClientError>> + Send + 'static {
        let mut state = self.state.lock().unwrap();
        state
            .list_requests
            .push((stream.to_string(), next_token, filter));
        next(&mut state.listings)
    }

    fn describe_stream_summary(
        &self,
        stream: &str,
    ) -> impl Future<Output = Result<StreamSummary, ClientError>> + Send + 'static {
        let mut state = self.state.lock().unwrap();
        state.describe_requests.push(stream.to_string());
        next(&mut state.summaries)
    }

    fn get_shard_iterator(
        &self,
        request: ShardIteratorRequest,
    ) -> impl Future<Output = Result<String, ClientError>> + Send + 'static {
        let iterator = format!("{}/{}", request.shard_id, request.iterator_type);
        self.state.lock().unwrap().iterator_requests.push(request);
        future::ready(Ok(iterator)).boxed()
    }

    fn get_records(
        &self,
        iterator: String,
    ) -> impl Future<Output = Result<Records, ClientError>> + Send + 'static {
        let state = self.state.lock().unwrap();
        let result = state
            .records
            .get(&iterator)
            .cloned()
            .ok_or(ClientError::InvalidArgument(iterator));
        future::ready(result).boxed()
    }
}
