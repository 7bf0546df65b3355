//! In-process shards keyed by address. Used by tests and by library callers that want to
//! inspect what a load would write.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{ShardConnection, ShardConnector};
use crate::error::StoreError;
use crate::utils::config::StoreTimeouts;

type Items = HashMap<String, Vec<u8>>;

/// Connector whose shards are hash maps. Clones share the same shards.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    shards: Arc<Mutex<HashMap<String, Arc<Mutex<Items>>>>>,
    down: Arc<Mutex<HashSet<String>>>,
    reject_keys: Arc<Mutex<HashSet<String>>>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `addr` until [`Self::bring_up`].
    pub fn take_down(&self, addr: &str) {
        self.down
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(addr.to_string());
    }

    pub fn bring_up(&self, addr: &str) {
        self.down
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(addr);
    }

    /// Make every set of `key` fail, as a remote rejection would.
    pub fn reject_key(&self, key: &str) {
        self.reject_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
    }

    /// Value stored under `key` on the shard at `addr`.
    pub fn get(&self, addr: &str, key: &str) -> Option<Vec<u8>> {
        let shards = self.shards.lock().unwrap_or_else(PoisonError::into_inner);
        let items = shards.get(addr)?;
        let items = items.lock().unwrap_or_else(PoisonError::into_inner);
        items.get(key).cloned()
    }

    /// Number of keys stored on the shard at `addr`.
    pub fn key_count(&self, addr: &str) -> usize {
        let shards = self.shards.lock().unwrap_or_else(PoisonError::into_inner);
        shards.get(addr).map_or(0, |items| {
            items.lock().unwrap_or_else(PoisonError::into_inner).len()
        })
    }

    /// Successful `connect` calls so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

/// One in-process shard.
pub struct MemoryShard {
    addr: String,
    items: Arc<Mutex<Items>>,
    reject_keys: Arc<Mutex<HashSet<String>>>,
}

impl ShardConnection for MemoryShard {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self
            .reject_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
        {
            return Err(StoreError::write(&self.addr, "rejected by shard"));
        }
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

impl ShardConnector for MemoryConnector {
    fn connect(
        &self,
        addr: &str,
        _timeouts: &StoreTimeouts,
    ) -> Result<Arc<dyn ShardConnection>, StoreError> {
        if self
            .down
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(addr)
        {
            return Err(StoreError::connect(addr, "connection refused"));
        }
        let items = {
            let mut shards = self.shards.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(shards.entry(addr.to_string()).or_default())
        };
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryShard {
            addr: addr.to_string(),
            items,
            reject_keys: Arc::clone(&self.reject_keys),
        }))
    }
}
