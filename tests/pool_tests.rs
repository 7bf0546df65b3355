mod common;

use appsload::engine::decode;
use appsload::store::{MemoryConnector, PoolSettings, ShardPool};
use appsload::utils::config::StoreTimeouts;
use common::{GAID_ADDR, IDFA_ADDR};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn settings(retries: u32, dead_retry: Duration) -> PoolSettings {
    PoolSettings {
        timeouts: StoreTimeouts::default(),
        retries,
        retry_backoff: Duration::from_millis(1),
        dead_retry,
    }
}

fn pool(connector: &MemoryConnector, retries: u32, dead_retry: Duration) -> ShardPool {
    ShardPool::new(Arc::new(connector.clone()), settings(retries, dead_retry))
}

#[test]
fn test_connects_lazily_once_per_shard() {
    let mem = MemoryConnector::new();
    let pool = pool(&mem, 0, Duration::from_secs(20));
    assert_eq!(mem.connects(), 0);
    assert_eq!(pool.live_connections(), 0);

    for i in 0..10 {
        assert!(pool.write("idfa", IDFA_ADDR, &format!("idfa:{i}"), b"x"));
    }
    assert_eq!(mem.connects(), 1);
    assert!(pool.write("gaid", GAID_ADDR, "gaid:1", b"y"));
    assert_eq!(mem.connects(), 2);
    assert_eq!(pool.live_connections(), 2);
    assert_eq!(mem.key_count(IDFA_ADDR), 10);
    assert_eq!(mem.get(GAID_ADDR, "gaid:1"), Some(b"y".to_vec()));
}

#[test]
fn test_concurrent_writers_share_one_connection() {
    let mem = MemoryConnector::new();
    let pool = Arc::new(pool(&mem, 0, Duration::from_secs(20)));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for i in 0..50 {
                    assert!(pool.write("idfa", IDFA_ADDR, &format!("idfa:{t}-{i}"), b"v"));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(mem.connects(), 1);
    assert_eq!(mem.key_count(IDFA_ADDR), 400);
}

#[test]
fn test_dead_shard_fails_fast_until_window_passes() {
    let mem = MemoryConnector::new();
    mem.take_down(IDFA_ADDR);
    let pool = pool(&mem, 0, Duration::from_secs(3600));

    assert!(!pool.write("idfa", IDFA_ADDR, "idfa:1", b"x"));
    mem.bring_up(IDFA_ADDR);
    // Still inside the dead window: no reconnect attempt.
    assert!(!pool.write("idfa", IDFA_ADDR, "idfa:2", b"x"));
    assert_eq!(mem.connects(), 0);

    // Other shards are unaffected.
    assert!(pool.write("gaid", GAID_ADDR, "gaid:1", b"x"));
}

#[test]
fn test_dead_shard_reconnects_after_window() {
    let mem = MemoryConnector::new();
    mem.take_down(IDFA_ADDR);
    let pool = pool(&mem, 0, Duration::ZERO);

    assert!(!pool.write("idfa", IDFA_ADDR, "idfa:1", b"x"));
    mem.bring_up(IDFA_ADDR);
    assert!(pool.write("idfa", IDFA_ADDR, "idfa:2", b"x"));
    assert_eq!(mem.connects(), 1);
}

#[test]
fn test_failed_write_evicts_connection() {
    let mem = MemoryConnector::new();
    mem.reject_key("idfa:bad");
    let pool = pool(&mem, 0, Duration::from_secs(20));

    assert!(pool.write("idfa", IDFA_ADDR, "idfa:ok", b"x"));
    assert!(!pool.write("idfa", IDFA_ADDR, "idfa:bad", b"x"));
    assert_eq!(pool.live_connections(), 0);
    assert!(pool.write("idfa", IDFA_ADDR, "idfa:ok2", b"x"));
    assert_eq!(mem.connects(), 2);
}

#[test]
fn test_retries_reconnect_each_attempt() {
    let mem = MemoryConnector::new();
    mem.reject_key("idfa:bad");
    let pool = pool(&mem, 2, Duration::from_secs(20));

    assert!(!pool.write("idfa", IDFA_ADDR, "idfa:bad", b"x"));
    // One connect per attempt: the first plus two retries.
    assert_eq!(mem.connects(), 3);
}

#[test]
fn test_written_payload_decodes() {
    let mem = MemoryConnector::new();
    let pool = pool(&mem, 0, Duration::from_secs(20));
    let rec = common::record("idfa", "dev", 55.55, 42.42, &[1, 2, 3]);
    assert!(pool.write("idfa", IDFA_ADDR, &rec.key(), &appsload::engine::encode(&rec)));
    let stored = mem.get(IDFA_ADDR, "idfa:dev").unwrap();
    assert_eq!(decode("idfa:dev", &stored).unwrap(), rec);
}
