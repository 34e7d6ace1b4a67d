//! Run configuration, its defaults, and validation.
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Hard ceiling of records per put request on the stream service.
pub const TRANSPORT_MAX_BATCH: usize = 500;
/// Largest data blob a single record may carry.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("max_batch_size must be between 1 and {max}, got {0}", max = TRANSPORT_MAX_BATCH)]
    BatchSize(usize),
    #[error("size range must satisfy 0 < min < max, got [{min}, {max})")]
    SizeRange { min: u32, max: u32 },
    #[error("size_scale must be positive")]
    SizeScale,
    #[error("largest payload would be {0} bytes, above the {max} byte record limit", max = MAX_RECORD_BYTES)]
    PayloadTooLarge(usize),
    #[error("stream_name must not be empty")]
    StreamName,
    #[error("static routing needs at least one start hash key")]
    EmptyShardTable,
    #[error("start hash key {0:?} is not a decimal number")]
    HashKey(String),
    #[error("max_chunks_per_second must be finite and at least one chunk per day, got {0}")]
    Pacing(f64),
    #[error("record count {0} is too large for this platform")]
    RecordCount(u64),
    #[error("invalid batch request: {0}")]
    Request(#[from] serde_json::Error),
    #[error("config file {path}: {reason}")]
    File { path: String, reason: String },
}

/// Inclusive-exclusive range of size units drawn per record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

impl Default for SizeRange {
    fn default() -> Self {
        Self { min: 10, max: 50 }
    }
}

/// How records are steered to shards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RoutingMode {
    /// No explicit hash key; placement follows the partition key hash.
    None,
    /// Look up open shards with a describe call before the run.
    Describe,
    /// Use a fixed table of shard start hash keys.
    Static { start_hash_keys: Vec<String> },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKeyMode {
    /// Fresh random UUID per record.
    #[default]
    Uuid,
    /// `pk-{index}` using the record's position in the run.
    Indexed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub stream_name: String,
    pub max_batch_size: usize,
    pub size_range: SizeRange,
    /// Bytes per size unit.
    pub size_scale: u32,
    pub routing: RoutingMode,
    pub partition_keys: PartitionKeyMode,
    pub seed: Option<u64>,
    pub max_chunks_per_second: Option<f64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            stream_name: "tripstream".to_string(),
            max_batch_size: 50,
            size_range: SizeRange::default(),
            size_scale: 500,
            routing: RoutingMode::Describe,
            partition_keys: PartitionKeyMode::Uuid,
            seed: None,
            max_chunks_per_second: None,
        }
    }
}

impl LoadConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_err = |reason: String| ConfigError::File {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| file_err(e.to_string()))?;
        serde_yaml::from_str(&text).map_err(|e| file_err(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_name.trim().is_empty() {
            return Err(ConfigError::StreamName);
        }
        if self.max_batch_size == 0 || self.max_batch_size > TRANSPORT_MAX_BATCH {
            return Err(ConfigError::BatchSize(self.max_batch_size));
        }
        let SizeRange { min, max } = self.size_range;
        if min == 0 || min >= max {
            return Err(ConfigError::SizeRange { min, max });
        }
        if self.size_scale == 0 {
            return Err(ConfigError::SizeScale);
        }
        let largest = (max as usize - 1) * self.size_scale as usize;
        if largest > MAX_RECORD_BYTES {
            return Err(ConfigError::PayloadTooLarge(largest));
        }
        if let RoutingMode::Static { start_hash_keys } = &self.routing {
            if start_hash_keys.is_empty() {
                return Err(ConfigError::EmptyShardTable);
            }
            if let Some(bad) = start_hash_keys
                .iter()
                .find(|k| k.is_empty() || !k.bytes().all(|b| b.is_ascii_digit()))
            {
                return Err(ConfigError::HashKey(bad.clone()));
            }
        }
        if let Some(rate) = self.max_chunks_per_second {
            if !rate.is_finite() || crate::rate::pacing_interval(rate).is_none() {
                return Err(ConfigError::Pacing(rate));
            }
        }
        Ok(())
    }
}

/// Input of a single run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(alias = "batchSize", alias = "BatchSize", alias = "TotalRecordCount")]
    pub total_record_count: u64,
    /// Accepted for compatibility; payload sizing ignores it.
    #[serde(default, alias = "itemSizeInKB", alias = "ItemSizeInKB")]
    pub item_size_hint: Option<u32>,
}

impl BatchRequest {
    pub fn new(total_record_count: u64) -> Self {
        Self {
            total_record_count,
            item_size_hint: None,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}
