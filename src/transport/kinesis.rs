//! Kinesis adapter (feature `transport-kinesis`), using the AWS SDK.
//!
//! Credentials and region come from the default provider chain; the
//! `region` and `endpoint_url` connect params override them.
use aws_config::{BehaviorVersion, Region};
use aws_sdk_kinesis::Client;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::PutRecordsRequestEntry;

use crate::assign::Envelope;
use crate::transport::{
    ConnectOptions, PutRecordEntry, PutRecordsOutput, ShardDescription, StreamDescriptor,
    StreamTransport, TransportError,
};

pub struct KinesisTransport {
    client: Client,
}

pub async fn connect(opts: ConnectOptions) -> Result<Box<dyn StreamTransport>, TransportError> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = opts.params.get("region") {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(url) = opts.params.get("endpoint_url") {
        loader = loader.endpoint_url(url.clone());
    }
    let sdk_config = loader.load().await;
    let client = Client::new(&sdk_config);
    Ok(Box::new(KinesisTransport { client }))
}

fn to_request_entry(envelope: &Envelope) -> Result<PutRecordsRequestEntry, TransportError> {
    PutRecordsRequestEntry::builder()
        .partition_key(envelope.partition_key.clone())
        .set_explicit_hash_key(envelope.explicit_hash_key.clone())
        .data(Blob::new(envelope.data.to_vec()))
        .build()
        .map_err(|e| TransportError::Put(e.to_string()))
}

#[async_trait::async_trait]
impl StreamTransport for KinesisTransport {
    async fn describe_stream(&self, stream: &str) -> Result<StreamDescriptor, TransportError> {
        let output = self
            .client
            .describe_stream()
            .stream_name(stream)
            .send()
            .await
            .map_err(|e| TransportError::Describe(e.to_string()))?;
        let description = output
            .stream_description()
            .ok_or_else(|| TransportError::Describe("missing stream description".into()))?;
        let shards = description
            .shards()
            .iter()
            .map(|shard| ShardDescription {
                shard_id: shard.shard_id().to_string(),
                starting_hash_key: shard
                    .hash_key_range()
                    .map(|r| r.starting_hash_key().to_string())
                    .unwrap_or_default(),
                ending_sequence_number: shard
                    .sequence_number_range()
                    .and_then(|r| r.ending_sequence_number())
                    .map(str::to_string),
            })
            .collect();
        Ok(StreamDescriptor {
            stream_name: stream.to_string(),
            shards,
        })
    }

    async fn put_records(
        &self,
        stream: &str,
        records: &[Envelope],
    ) -> Result<PutRecordsOutput, TransportError> {
        let entries = records
            .iter()
            .map(to_request_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let output = self
            .client
            .put_records()
            .stream_name(stream)
            .set_records(Some(entries))
            .send()
            .await
            .map_err(|e| TransportError::Put(e.to_string()))?;
        let entries = output
            .records()
            .iter()
            .map(|r| PutRecordEntry {
                shard_id: r.shard_id().map(str::to_string),
                sequence_number: r.sequence_number().map(str::to_string),
                error_code: r.error_code().map(str::to_string),
                error_message: r.error_message().map(str::to_string),
            })
            .collect();
        Ok(PutRecordsOutput {
            failed_record_count: output.failed_record_count().unwrap_or(0).max(0) as u32,
            entries,
        })
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        self.client
            .list_streams()
            .limit(1)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Connect(e.to_string()))
    }
}
