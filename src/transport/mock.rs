//! In-memory stream used by tests and dry runs (feature `transport-mock`).
//!
//! Recognised connect params: `shards` (number of open shards spread evenly
//! over the 128-bit hash space, default 4) and `describe_error` (any value
//! makes `describe_stream` fail).
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::assign::Envelope;
use crate::transport::{
    ConnectOptions, PutRecordEntry, PutRecordsOutput, ShardDescription, StreamDescriptor,
    StreamTransport, TransportError,
};

const THROTTLED: &str = "ProvisionedThroughputExceededException";

#[derive(Default)]
struct MockState {
    put_calls: usize,
    chunks: Vec<Vec<Envelope>>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    shards: Vec<ShardDescription>,
    describe_error: Option<String>,
    failed_on_call: BTreeMap<usize, u32>,
    error_on_call: BTreeMap<usize, String>,
    state: Arc<Mutex<MockState>>,
}

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn StreamTransport>, TransportError> {
    let count: usize = match opts.params.get("shards") {
        Some(s) => s
            .parse()
            .map_err(|_| TransportError::Connect(format!("invalid shard count: {s}")))?,
        None => 4,
    };
    let mut transport = MockTransport::new().with_even_shards(count);
    if let Some(reason) = opts.params.get("describe_error") {
        transport = transport.with_describe_error(reason.clone());
    }
    Ok(Box::new(transport))
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open shards owning equal slices of the 128-bit hash key space.
    pub fn with_even_shards(mut self, count: usize) -> Self {
        let step = if count == 0 { 0 } else { u128::MAX / count as u128 };
        self.shards = (0..count)
            .map(|i| ShardDescription {
                shard_id: format!("shardId-{i:012}"),
                starting_hash_key: (step * i as u128).to_string(),
                ending_sequence_number: None,
            })
            .collect();
        self
    }

    pub fn with_shards(mut self, shards: Vec<ShardDescription>) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_describe_error(mut self, reason: impl Into<String>) -> Self {
        self.describe_error = Some(reason.into());
        self
    }

    /// Reject the first `failed` records of the put call numbered `call` (0-based).
    pub fn with_failed_records(mut self, call: usize, failed: u32) -> Self {
        self.failed_on_call.insert(call, failed);
        self
    }

    /// Fail the whole put call numbered `call` (0-based).
    pub fn with_error_on_call(mut self, call: usize, reason: impl Into<String>) -> Self {
        self.error_on_call.insert(call, reason.into());
        self
    }

    /// Chunks accepted so far, in submission order.
    pub fn submitted(&self) -> Vec<Vec<Envelope>> {
        self.state.lock().map(|s| s.chunks.clone()).unwrap_or_default()
    }

    pub fn put_calls(&self) -> usize {
        self.state.lock().map(|s| s.put_calls).unwrap_or_default()
    }

    fn shard_for(&self, envelope: &Envelope) -> Option<&ShardDescription> {
        let open: Vec<&ShardDescription> = self.shards.iter().filter(|s| s.is_open()).collect();
        match envelope.explicit_hash_key.as_deref() {
            Some(key) => {
                let key: u128 = key.parse().ok()?;
                open.into_iter()
                    .filter(|s| s.starting_hash_key.parse::<u128>().is_ok_and(|start| start <= key))
                    .max_by_key(|s| s.starting_hash_key.parse::<u128>().unwrap_or_default())
            }
            None if open.is_empty() => None,
            None => {
                let h = envelope
                    .partition_key
                    .bytes()
                    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
                open.get(h % open.len()).copied()
            }
        }
    }
}

#[async_trait::async_trait]
impl StreamTransport for MockTransport {
    async fn describe_stream(&self, stream: &str) -> Result<StreamDescriptor, TransportError> {
        if let Some(reason) = &self.describe_error {
            return Err(TransportError::Describe(reason.clone()));
        }
        Ok(StreamDescriptor {
            stream_name: stream.to_string(),
            shards: self.shards.clone(),
        })
    }

    async fn put_records(
        &self,
        _stream: &str,
        records: &[Envelope],
    ) -> Result<PutRecordsOutput, TransportError> {
        let call = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| TransportError::Other("mock state poisoned".into()))?;
            let call = state.put_calls;
            state.put_calls += 1;
            if let Some(reason) = self.error_on_call.get(&call) {
                return Err(TransportError::Put(reason.clone()));
            }
            state.chunks.push(records.to_vec());
            call
        };

        let failed = self
            .failed_on_call
            .get(&call)
            .copied()
            .unwrap_or(0)
            .min(records.len() as u32);
        let entries = records
            .iter()
            .enumerate()
            .map(|(i, envelope)| {
                if (i as u32) < failed {
                    PutRecordEntry {
                        error_code: Some(THROTTLED.into()),
                        error_message: Some("Rate exceeded for shard".into()),
                        ..Default::default()
                    }
                } else {
                    PutRecordEntry {
                        shard_id: self.shard_for(envelope).map(|s| s.shard_id.clone()),
                        sequence_number: Some(format!("{call:08}{i:04}")),
                        ..Default::default()
                    }
                }
            })
            .collect();
        Ok(PutRecordsOutput {
            failed_record_count: failed,
            entries,
        })
    }
}
