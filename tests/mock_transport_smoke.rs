#![cfg(feature = "transport-mock")]
use shard_loadgen::transport::config::parse_connect_kv;
use shard_loadgen::transport::{ConnectOptions, Engine, TransportBuilder};

#[tokio::test]
async fn describe_mock_smoke() {
    let opts = parse_connect_kv(&["shards=3".to_string()]);
    let t = TransportBuilder::connect(Engine::Mock, opts).await.expect("connect");
    t.health_check().await.expect("health");
    let desc = t.describe_stream("tripstream").await.expect("describe");
    assert_eq!(desc.stream_name, "tripstream");
    assert_eq!(desc.shards.len(), 3);
    assert!(desc.shards.iter().all(|s| s.is_open()));
    assert_eq!(desc.shards[0].starting_hash_key, "0");
}

#[tokio::test]
async fn put_mock_smoke() {
    let t = TransportBuilder::connect(Engine::Mock, ConnectOptions::default()).await.expect("connect");
    let envelope = shard_loadgen::assign::Envelope {
        partition_key: "pk-0".into(),
        explicit_hash_key: None,
        data: bytes::Bytes::from_static(b"hello"),
    };
    let out = t.put_records("tripstream", &[envelope]).await.expect("put");
    assert_eq!(out.failed_record_count, 0);
    assert_eq!(out.entries.len(), 1);
    assert!(out.entries[0].shard_id.is_some());
    t.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn describe_error_param_fails_lookup() {
    let opts = parse_connect_kv(&["describe_error=ResourceNotFound".to_string()]);
    let t = TransportBuilder::connect(Engine::Mock, opts).await.expect("connect");
    assert!(t.describe_stream("tripstream").await.is_err());
}
