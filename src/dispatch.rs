//! Sequential chunk dispatch: generate, batch, route, submit.
//!
//! One chunk is in flight at a time. Records the stream rejects inside an
//! accepted request are counted and logged but never retried; a failed
//! request aborts the run and the transport error is returned as-is.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assign::{Envelope, assign};
use crate::batch;
use crate::config::{BatchRequest, ConfigError, LoadConfig};
use crate::metrics::stats::{RunStats, StatsSnapshot};
use crate::payload::RecordGenerator;
use crate::rate::RateController;
use crate::shards::{ShardSource, ShardTable};
use crate::transport::{StreamTransport, TransportError};

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

/// Outcome of one submitted chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub chunk_index: usize,
    pub record_count: usize,
    pub failed_count: u32,
    pub bytes: usize,
    #[serde(skip)]
    pub latency: Duration,
    /// Rejected records grouped by the stream's error code.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures_by_code: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub stream_name: String,
    pub routing: ShardSource,
    pub records_requested: u64,
    pub chunks: Vec<BatchResult>,
    pub cancelled: bool,
    pub completed_at: DateTime<Utc>,
    pub stats: StatsSnapshot,
}

impl RunSummary {
    pub fn failed_count(&self) -> u64 {
        self.chunks.iter().map(|c| c.failed_count as u64).sum()
    }
}

pub struct Dispatcher {
    transport: Arc<dyn StreamTransport>,
    config: LoadConfig,
}

impl Dispatcher {
    /// Validates `config` up front so no transport call happens with bad limits.
    pub fn new(transport: Arc<dyn StreamTransport>, config: LoadConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Submit one chunk and report how many of its records were rejected.
    pub async fn submit(&self, chunk_index: usize, chunk: &[Envelope]) -> Result<BatchResult, TransportError> {
        let started = Instant::now();
        let output = self.transport.put_records(&self.config.stream_name, chunk).await?;
        let latency = started.elapsed();

        let mut failures_by_code = BTreeMap::new();
        for code in output.entries.iter().filter_map(|e| e.error_code.as_deref()) {
            *failures_by_code.entry(code.to_string()).or_default() += 1;
        }
        Ok(BatchResult {
            chunk_index,
            record_count: chunk.len(),
            failed_count: output.failed_record_count,
            bytes: chunk.iter().map(|e| e.data.len()).sum(),
            latency,
            failures_by_code,
        })
    }

    pub async fn run(&self, request: &BatchRequest) -> Result<RunSummary, RunError> {
        self.run_until(request, CancellationToken::new()).await
    }

    /// Like `run`, but stops before the next chunk once `cancel` fires.
    pub async fn run_until(
        &self,
        request: &BatchRequest,
        cancel: CancellationToken,
    ) -> Result<RunSummary, RunError> {
        let cfg = &self.config;
        let total = usize::try_from(request.total_record_count)
            .map_err(|_| ConfigError::RecordCount(request.total_record_count))?;
        if let Some(hint) = request.item_size_hint {
            debug!(hint, "item size hint ignored, sizing follows size_range");
        }

        let shards = ShardTable::resolve(self.transport.as_ref(), &cfg.stream_name, &cfg.routing).await;

        let mut generator = RecordGenerator::new(cfg.size_range, cfg.size_scale, cfg.seed);
        info!(
            stream = %cfg.stream_name,
            records = total,
            chunks = batch::chunk_count(total, cfg.max_batch_size),
            "starting run"
        );

        let mut pacing = match cfg.max_chunks_per_second {
            Some(rate) => Some(RateController::new(rate).ok_or(ConfigError::Pacing(rate))?),
            None => None,
        };
        let mut stats = RunStats::new();
        let mut results = Vec::new();
        let mut cancelled = false;

        // Records live only for the chunk they belong to.
        for (chunk_index, len) in batch::chunk_lens(total, cfg.max_batch_size).enumerate() {
            if cancel.is_cancelled() {
                info!(chunk_index, "run cancelled, remaining chunks skipped");
                cancelled = true;
                break;
            }
            if let Some(rc) = &mut pacing {
                tokio::select! {
                    _ = rc.wait_for_next() => {}
                    _ = cancel.cancelled() => {
                        info!(chunk_index, "run cancelled, remaining chunks skipped");
                        cancelled = true;
                        break;
                    }
                }
            }

            let records = generator.generate(len);
            let first_index = (chunk_index * cfg.max_batch_size) as u64;
            let envelopes = assign(&records, first_index, &shards, cfg.partition_keys);

            let result = self.submit(chunk_index, &envelopes).await?;
            if result.failed_count > 0 {
                info!(chunk_index, failed = result.failed_count, "Failed Items: {}", result.failed_count);
            }
            stats.record_chunk(&result);
            results.push(result);
        }

        let completed_at = Utc::now();
        let snapshot = stats.snapshot();
        info!(
            records = snapshot.records_submitted,
            failed = snapshot.records_failed,
            chunks = snapshot.chunks_submitted,
            cancelled,
            "Completed. {completed_at}"
        );
        Ok(RunSummary {
            stream_name: cfg.stream_name.clone(),
            routing: shards.source(),
            records_requested: request.total_record_count,
            chunks: results,
            cancelled,
            completed_at,
            stats: snapshot,
        })
    }
}
