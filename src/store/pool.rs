//! Shard connection pool: one lazily opened connection per shard, shared by every writer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{ShardConnection, ShardConnector};
use crate::Opts;
use crate::error::StoreError;
use crate::utils::config::StoreTimeouts;

/// Connection and retry behavior for a [`ShardPool`].
#[derive(Clone, Copy, Debug)]
pub struct PoolSettings {
    pub timeouts: StoreTimeouts,
    /// Extra attempts after a failed write. 0 = fail on the first error.
    pub retries: u32,
    /// Delay before the first retry; doubles after each.
    pub retry_backoff: Duration,
    /// After a failed connect, writes to that shard fail fast for this long.
    pub dead_retry: Duration,
}

impl From<&Opts> for PoolSettings {
    fn from(o: &Opts) -> Self {
        PoolSettings {
            timeouts: o.timeouts,
            retries: o.retries,
            retry_backoff: o.retry_backoff,
            dead_retry: o.dead_retry,
        }
    }
}

/// Connection state of one shard.
enum Slot {
    Empty,
    Live(Arc<dyn ShardConnection>),
    Dead { until: Instant },
}

/// Shard id -> connection. The outer map lock is held only to find a shard's slot; the slot's
/// own lock serializes connection creation for that shard without stalling the others.
pub struct ShardPool {
    connector: Arc<dyn ShardConnector>,
    settings: PoolSettings,
    slots: Mutex<HashMap<String, Arc<Mutex<Slot>>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ShardPool {
    pub fn new(connector: Arc<dyn ShardConnector>, settings: PoolSettings) -> Self {
        ShardPool {
            connector,
            settings,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Write `payload` under `key` on `shard` (at `addr`). Returns false on any failure after
    /// the configured retries; errors never propagate to the caller.
    pub fn write(&self, shard: &str, addr: &str, key: &str, payload: &[u8]) -> bool {
        let mut delay = self.settings.retry_backoff;
        for attempt in 0..=self.settings.retries {
            if attempt > 0 {
                thread::sleep(delay);
                delay = delay.saturating_mul(2);
            }
            match self.try_write(shard, addr, key, payload) {
                Ok(()) => return true,
                Err(e @ StoreError::Dead { .. }) => debug!("{}: {}", key, e),
                Err(e) if attempt < self.settings.retries => {
                    debug!("{}: {} (attempt {})", key, e, attempt + 1)
                }
                Err(e) => warn!("{}: {}", key, e),
            }
        }
        false
    }

    /// Number of shards with a live connection.
    pub fn live_connections(&self) -> usize {
        let slots: Vec<_> = lock(&self.slots).values().cloned().collect();
        slots
            .iter()
            .filter(|s| matches!(*lock(s), Slot::Live(_)))
            .count()
    }

    fn try_write(
        &self,
        shard: &str,
        addr: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(), StoreError> {
        let conn = self.connection(shard, addr)?;
        conn.set(key, payload).inspect_err(|e| {
            if e.is_transport() {
                self.evict(shard, &conn);
            }
        })
    }

    fn slot(&self, shard: &str) -> Arc<Mutex<Slot>> {
        let mut slots = lock(&self.slots);
        Arc::clone(
            slots
                .entry(shard.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Slot::Empty))),
        )
    }

    /// Live connection for `shard`, opening one if needed.
    fn connection(&self, shard: &str, addr: &str) -> Result<Arc<dyn ShardConnection>, StoreError> {
        let slot = self.slot(shard);
        let mut slot = lock(&slot);
        match &*slot {
            Slot::Live(conn) => return Ok(Arc::clone(conn)),
            Slot::Dead { until } if Instant::now() < *until => {
                return Err(StoreError::Dead {
                    addr: addr.to_string(),
                });
            }
            _ => {}
        }
        match self.connector.connect(addr, &self.settings.timeouts) {
            Ok(conn) => {
                info!("Opening connection, shard={} addr={}", shard, addr);
                *slot = Slot::Live(Arc::clone(&conn));
                Ok(conn)
            }
            Err(e) => {
                warn!("{} (retry in {:?})", e, self.settings.dead_retry);
                *slot = Slot::Dead {
                    until: Instant::now() + self.settings.dead_retry,
                };
                Err(e)
            }
        }
    }

    /// Drop `failed` so the next write reconnects. No-op if another writer already replaced it.
    fn evict(&self, shard: &str, failed: &Arc<dyn ShardConnection>) {
        let slot = self.slot(shard);
        let mut slot = lock(&slot);
        if let Slot::Live(conn) = &*slot
            && Arc::ptr_eq(conn, failed)
        {
            *slot = Slot::Empty;
        }
    }
}
