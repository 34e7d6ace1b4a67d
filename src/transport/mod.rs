//! Transport abstraction: trait, types, and builder factory.

pub mod config;
#[cfg(feature = "transport-kinesis")]
pub mod kinesis;
#[cfg(any(test, feature = "transport-mock"))]
pub mod mock;

use std::collections::BTreeMap;

use crate::assign::Envelope;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Engine {
    Kinesis,
    #[cfg(any(test, feature = "transport-mock"))]
    Mock,
}

#[derive(Clone, Debug, Default)]
pub struct ConnectOptions {
    pub params: BTreeMap<String, String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("connect: {0}")]
    Connect(String),
    #[error("describe: {0}")]
    Describe(String),
    #[error("put records: {0}")]
    Put(String),
    #[error("other: {0}")]
    Other(String),
}

/// One shard as reported by the stream service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardDescription {
    pub shard_id: String,
    pub starting_hash_key: String,
    /// `None` while the shard still accepts writes; set once it has been
    /// closed by a split or merge.
    pub ending_sequence_number: Option<String>,
}

impl ShardDescription {
    pub fn is_open(&self) -> bool {
        self.ending_sequence_number
            .as_deref()
            .is_none_or(|s| s.is_empty())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StreamDescriptor {
    pub stream_name: String,
    pub shards: Vec<ShardDescription>,
}

/// Per-record outcome of a put call, in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutRecordEntry {
    pub shard_id: Option<String>,
    pub sequence_number: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl PutRecordEntry {
    pub fn is_failed(&self) -> bool {
        self.error_code.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PutRecordsOutput {
    pub failed_record_count: u32,
    pub entries: Vec<PutRecordEntry>,
}

#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn describe_stream(&self, stream: &str) -> Result<StreamDescriptor, TransportError>;
    // A returned error means the whole request was rejected; per-record
    // rejections come back inside the output.
    async fn put_records(
        &self,
        stream: &str,
        records: &[Envelope],
    ) -> Result<PutRecordsOutput, TransportError>;
    async fn health_check(&self) -> Result<(), TransportError> {
        Ok(())
    }
    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct TransportBuilder;

impl TransportBuilder {
    pub async fn connect(
        engine: Engine,
        opts: ConnectOptions,
    ) -> Result<Box<dyn StreamTransport>, TransportError> {
        match engine {
            Engine::Kinesis => {
                #[cfg(feature = "transport-kinesis")]
                {
                    return crate::transport::kinesis::connect(opts).await;
                }
                #[cfg(not(feature = "transport-kinesis"))]
                {
                    let _ = opts;
                    Err(TransportError::Connect("kinesis feature disabled".into()))
                }
            }
            #[cfg(any(test, feature = "transport-mock"))]
            Engine::Mock => crate::transport::mock::connect(opts).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(end: Option<&str>) -> ShardDescription {
        ShardDescription {
            shard_id: "shardId-000000000000".into(),
            starting_hash_key: "0".into(),
            ending_sequence_number: end.map(str::to_string),
        }
    }

    #[test]
    fn open_shard_has_no_ending_sequence() {
        assert!(shard(None).is_open());
        assert!(shard(Some("")).is_open());
        assert!(!shard(Some("49590338271490256608559692540925702759324208523137515618")).is_open());
    }
}
