//! Issue calls against a single stream.

use crate::{
    iterators::ShardIteratorRequest, range::HashRange, Client, ClientError, Error,
    ListShardsResponse, Record, Shard, ShardFilter, StreamSummary,
};
use futures::{executor::block_on, future::BoxFuture, Future, FutureExt};

/// Issues calls against a single stream.
#[derive(Clone)]
pub struct Helper<C: Client> {
    client: C,
    stream: String,
}

impl<C: Client> Helper<C> {
    /// Create a helper for `stream`.
    pub fn new(client: C, stream: String) -> Self {
        Self { client, stream }
    }

    /// Returns the name of the stream.
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// List one page of every shard within the retention period (open or closed).
    pub fn list_all_shards(
        &self,
        next_token: Option<String>,
    ) -> BoxFuture<'static, Result<ListShardsResponse, ClientError>> {
        self.client
            .list_shards(&self.stream, next_token, ShardFilter::FromTrimHorizon)
            .boxed()
    }

    /// Describe the size of the stream.
    pub fn describe_stream_summary(
        &self,
    ) -> BoxFuture<'static, Result<StreamSummary, ClientError>> {
        self.client.describe_stream_summary(&self.stream).boxed()
    }

    /// Obtain an iterator for `request`.
    pub fn get_shard_iterator(
        &self,
        request: ShardIteratorRequest,
    ) -> BoxFuture<'static, Result<String, ClientError>> {
        self.client.get_shard_iterator(request).boxed()
    }

    /// Read the records available at `iterator`.
    pub fn get_records(
        &self,
        iterator: String,
    ) -> BoxFuture<'static, Result<(Vec<Record>, Option<String>), ClientError>> {
        self.client.get_records(iterator).boxed()
    }

    /// List every currently open shard, walking all pages.
    pub async fn list_open_shards(&self) -> Result<Vec<Shard>, ClientError> {
        let mut shards = Vec::new();
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_shards(&self.stream, next_token, ShardFilter::AtLatest)
                .await?;
            shards.extend(response.shards);
            next_token = response.next_token;
            if next_token.is_none() {
                return Ok(shards);
            }
        }
    }
}

/// Returns whether `shard` starts within `range`.
pub fn shard_belongs_to_range(shard: &Shard, range: &HashRange) -> bool {
    range.contains(shard.starting_hash_key)
}

/// Block the calling thread until `call` completes.
///
/// Never use this from a monitor step. A call whose result can no longer be delivered
/// (the producing side was dropped) is reported as [Error::Interrupted].
pub fn read_result<T>(call: impl Future<Output = Result<T, ClientError>>) -> Result<T, Error> {
    match block_on(call) {
        Ok(value) => Ok(value),
        Err(ClientError::Canceled) => Err(Error::Interrupted),
        Err(err) => Err(Error::Client(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{iterators::IteratorType, mocks, range::range_for};
    use bytes::Bytes;
    use commonware_macros::test_traced;
    use commonware_runtime::{deterministic, Runner};
    use std::time::UNIX_EPOCH;

    fn shard(id: &str, starting_hash_key: u128) -> Shard {
        Shard {
            id: id.into(),
            starting_hash_key,
            ending_hash_key: starting_hash_key,
            starting_sequence_number: "0".into(),
            ending_sequence_number: None,
        }
    }

    #[test_traced]
    fn test_list_open_shards() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let client = mocks::Client::new();
            client.push_listing(Ok(ListShardsResponse {
                shards: vec![shard("a", 0)],
                next_token: Some("page-2".into()),
            }));
            client.push_listing(Ok(ListShardsResponse {
                shards: vec![shard("b", 1), shard("c", 2)],
                next_token: None,
            }));
            let helper = Helper::new(client.clone(), "stream".into());

            let shards = helper.list_open_shards().await.unwrap();
            let ids: Vec<_> = shards.iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b", "c"]);
            assert_eq!(
                client.list_requests(),
                vec![
                    ("stream".into(), None, ShardFilter::AtLatest),
                    ("stream".into(), Some("page-2".into()), ShardFilter::AtLatest),
                ]
            );
        });
    }

    #[test_traced]
    fn test_list_open_shards_failure() {
        let executor = deterministic::Runner::default();
        executor.start(|_| async move {
            let client = mocks::Client::new();
            client.push_listing(Err(ClientError::Throttled("limit".into())));
            let helper = Helper::new(client, "stream".into());
            assert_eq!(
                helper.list_open_shards().await,
                Err(ClientError::Throttled("limit".into()))
            );
        });
    }

    #[test_traced]
    fn test_list_all_shards_filter() {
        let client = mocks::Client::new();
        client.push_listing(Ok(ListShardsResponse::default()));
        let helper = Helper::new(client.clone(), "stream".into());
        let response = read_result(helper.list_all_shards(None));
        assert_eq!(response.unwrap(), ListShardsResponse::default());
        assert_eq!(
            client.list_requests(),
            vec![("stream".into(), None, ShardFilter::FromTrimHorizon)]
        );
    }

    #[test_traced]
    fn test_read_result_interrupted() {
        let client = mocks::Client::new();
        let gate = client.gate_listing();
        let helper = Helper::new(client, "stream".into());
        let call = helper.list_all_shards(None);
        drop(gate);
        assert!(matches!(read_result(call), Err(Error::Interrupted)));
    }

    #[test_traced]
    fn test_read_result_failure() {
        let client = mocks::Client::new();
        client.push_summary(Err(ClientError::ResourceNotFound("stream".into())));
        let helper = Helper::new(client, "stream".into());
        assert!(matches!(
            read_result(helper.describe_stream_summary()),
            Err(Error::Client(ClientError::ResourceNotFound(_)))
        ));
    }

    #[test_traced]
    fn test_read_shard() {
        let client = mocks::Client::new();
        let helper = Helper::new(client.clone(), "stream".into());
        let request = ShardIteratorRequest {
            stream: "stream".into(),
            shard_id: "a".into(),
            iterator_type: IteratorType::TrimHorizon,
            starting_sequence_number: None,
            timestamp: None,
        };
        let iterator = read_result(helper.get_shard_iterator(request.clone())).unwrap();
        assert_eq!(client.iterator_requests(), vec![request]);

        let record = Record {
            sequence_number: "1".into(),
            partition_key: "key".into(),
            arrival: UNIX_EPOCH,
            data: Bytes::from_static(b"payload"),
        };
        client.push_records(&iterator, vec![record.clone()], None);
        let (records, next) = read_result(helper.get_records(iterator)).unwrap();
        assert_eq!(records, vec![record]);
        assert!(next.is_none());
    }

    #[test]
    fn test_shard_belongs_to_range() {
        let lower = range_for(2, 0);
        let upper = range_for(2, 1);
        let first = shard("first", 0);
        let last = shard("last", u128::MAX);
        assert!(shard_belongs_to_range(&first, &lower));
        assert!(!shard_belongs_to_range(&first, &upper));
        assert!(shard_belongs_to_range(&last, &upper));
    }
}
