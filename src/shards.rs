//! Shard table: the open hash-range start keys records are routed to.
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RoutingMode;
use crate::transport::{StreamDescriptor, StreamTransport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shard {
    pub start_hash_key: String,
}

/// Where the shard table of a run came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardSource {
    /// Explicit hash keys disabled by configuration.
    Disabled,
    /// Open shards reported by the stream service.
    Described,
    /// Fixed table from configuration.
    Static,
    /// Lookup failed or found no open shard; partition keys decide placement.
    Fallback,
}

/// Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardTable {
    source: ShardSource,
    shards: Vec<Shard>,
}

impl ShardTable {
    pub fn disabled() -> Self {
        Self {
            source: ShardSource::Disabled,
            shards: Vec::new(),
        }
    }

    pub fn fixed(start_hash_keys: &[String]) -> Self {
        Self {
            source: ShardSource::Static,
            shards: start_hash_keys
                .iter()
                .map(|k| Shard {
                    start_hash_key: k.clone(),
                })
                .collect(),
        }
    }

    /// Keep only shards still accepting writes, in the order reported.
    pub fn from_descriptor(descriptor: &StreamDescriptor) -> Self {
        let shards: Vec<Shard> = descriptor
            .shards
            .iter()
            .filter(|s| s.is_open())
            .map(|s| Shard {
                start_hash_key: s.starting_hash_key.clone(),
            })
            .collect();
        if shards.is_empty() {
            Self {
                source: ShardSource::Fallback,
                shards,
            }
        } else {
            Self {
                source: ShardSource::Described,
                shards,
            }
        }
    }

    /// Build the table for `mode`. A failed lookup degrades to partition-key
    /// routing instead of failing the run.
    pub async fn resolve(
        transport: &dyn StreamTransport,
        stream: &str,
        mode: &RoutingMode,
    ) -> Self {
        let table = match mode {
            RoutingMode::None => Self::disabled(),
            RoutingMode::Static { start_hash_keys } => Self::fixed(start_hash_keys),
            RoutingMode::Describe => match transport.describe_stream(stream).await {
                Ok(descriptor) => {
                    let table = Self::from_descriptor(&descriptor);
                    if table.source == ShardSource::Fallback {
                        warn!(stream, total = descriptor.shards.len(), "no open shards, routing by partition key");
                    }
                    table
                }
                Err(e) => {
                    warn!(stream, error = %e, "shard lookup failed, routing by partition key");
                    Self {
                        source: ShardSource::Fallback,
                        shards: Vec::new(),
                    }
                }
            },
        };
        info!(stream, source = ?table.source, shards = table.len(), "shard routing resolved");
        table
    }

    pub fn source(&self) -> ShardSource {
        self.source
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ShardDescription;
    use crate::transport::mock::MockTransport;

    fn described(key: &str, end: Option<&str>) -> ShardDescription {
        ShardDescription {
            shard_id: format!("shard-{key}"),
            starting_hash_key: key.to_string(),
            ending_sequence_number: end.map(str::to_string),
        }
    }

    #[test]
    fn closed_shards_are_dropped_and_order_kept() {
        let descriptor = StreamDescriptor {
            stream_name: "s".into(),
            shards: vec![
                described("0", Some("4959")),
                described("300", None),
                described("100", None),
                described("200", Some("")),
            ],
        };
        let table = ShardTable::from_descriptor(&descriptor);
        assert_eq!(table.source(), ShardSource::Described);
        let keys: Vec<&str> = table.shards().iter().map(|s| s.start_hash_key.as_str()).collect();
        assert_eq!(keys, vec!["300", "100", "200"]);
    }

    #[tokio::test]
    async fn lookup_error_falls_back() {
        let t = MockTransport::new().with_even_shards(4).with_describe_error("AccessDenied");
        let table = ShardTable::resolve(&t, "s", &RoutingMode::Describe).await;
        assert_eq!(table.source(), ShardSource::Fallback);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn all_closed_falls_back() {
        let t = MockTransport::new().with_shards(vec![described("0", Some("1"))]);
        let table = ShardTable::resolve(&t, "s", &RoutingMode::Describe).await;
        assert_eq!(table.source(), ShardSource::Fallback);
    }

    #[tokio::test]
    async fn static_and_disabled_skip_lookup() {
        let t = MockTransport::new().with_describe_error("must not be called");
        let keys = vec!["0".to_string(), "42".to_string()];
        let table = ShardTable::resolve(
            &t,
            "s",
            &RoutingMode::Static {
                start_hash_keys: keys,
            },
        )
        .await;
        assert_eq!(table.source(), ShardSource::Static);
        assert_eq!(table.len(), 2);
        let table = ShardTable::resolve(&t, "s", &RoutingMode::None).await;
        assert_eq!(table.source(), ShardSource::Disabled);
    }
}
