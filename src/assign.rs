//! Mapping records to the envelopes submitted to the stream.
use bytes::Bytes;

use crate::config::PartitionKeyMode;
use crate::payload::Record;
use crate::shards::ShardTable;

/// Unit submitted to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub partition_key: String,
    /// Pins the record to the shard owning this hash value when set.
    pub explicit_hash_key: Option<String>,
    pub data: Bytes,
}

/// Shard start key for the record at global position `index`, if routing
/// by explicit hash key is active.
pub fn explicit_hash_key(index: u64, shards: &ShardTable) -> Option<String> {
    let shards = shards.shards();
    if shards.is_empty() {
        return None;
    }
    let slot = (index % shards.len() as u64) as usize;
    Some(shards[slot].start_hash_key.clone())
}

pub fn partition_key(index: u64, mode: PartitionKeyMode) -> String {
    match mode {
        PartitionKeyMode::Uuid => uuid::Uuid::new_v4().to_string(),
        PartitionKeyMode::Indexed => format!("pk-{index}"),
    }
}

/// Wrap `records` starting at global position `first_index`. The index is
/// counted across the whole run, not per chunk.
pub fn assign(
    records: &[Record],
    first_index: u64,
    shards: &ShardTable,
    keys: PartitionKeyMode,
) -> Vec<Envelope> {
    records
        .iter()
        .enumerate()
        .map(|(offset, record)| {
            let index = first_index + offset as u64;
            Envelope {
                partition_key: partition_key(index, keys),
                explicit_hash_key: explicit_hash_key(index, shards),
                data: record.payload.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> ShardTable {
        let keys: Vec<String> = (0..n).map(|i| (i * 1000).to_string()).collect();
        ShardTable::fixed(&keys)
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                payload: Bytes::from(vec![b'1'; i + 1]),
            })
            .collect()
    }

    #[test]
    fn round_robin_wraps_over_table() {
        let shards = table(5);
        let envs = assign(&records(50), 0, &shards, PartitionKeyMode::Indexed);
        assert_eq!(envs[0].explicit_hash_key.as_deref(), Some("0"));
        assert_eq!(envs[5].explicit_hash_key.as_deref(), Some("0"));
        assert_eq!(envs[49].explicit_hash_key.as_deref(), Some("4000"));
        for (i, e) in envs.iter().enumerate() {
            assert_eq!(e.explicit_hash_key, Some(shards.shards()[i % 5].start_hash_key.clone()));
        }
    }

    #[test]
    fn index_continues_across_chunks() {
        let shards = table(3);
        let envs = assign(&records(2), 50, &shards, PartitionKeyMode::Indexed);
        assert_eq!(envs[0].partition_key, "pk-50");
        assert_eq!(envs[0].explicit_hash_key.as_deref(), Some("2000"));
        assert_eq!(envs[1].explicit_hash_key.as_deref(), Some("0"));
    }

    #[test]
    fn no_shards_means_no_explicit_key() {
        let envs = assign(&records(4), 0, &ShardTable::disabled(), PartitionKeyMode::Uuid);
        assert!(envs.iter().all(|e| e.explicit_hash_key.is_none()));
        assert!(envs.iter().all(|e| uuid::Uuid::parse_str(&e.partition_key).is_ok()));
    }

    #[test]
    fn hash_keys_are_deterministic_and_data_untouched() {
        let shards = table(4);
        let recs = records(10);
        let a = assign(&recs, 7, &shards, PartitionKeyMode::Uuid);
        let b = assign(&recs, 7, &shards, PartitionKeyMode::Uuid);
        let ka: Vec<_> = a.iter().map(|e| e.explicit_hash_key.clone()).collect();
        let kb: Vec<_> = b.iter().map(|e| e.explicit_hash_key.clone()).collect();
        assert_eq!(ka, kb);
        for (e, r) in a.iter().zip(&recs) {
            assert_eq!(e.data, r.payload);
        }
    }
}
