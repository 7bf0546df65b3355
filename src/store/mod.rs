//! Shard backends: the connector seam, the per-shard connection pool, and the stores behind it.

mod dry_run;
mod memcached;
mod memory;
pub mod pool;

pub use dry_run::DryRunConnector;
pub use memcached::MemcacheConnector;
pub use memory::{MemoryConnector, MemoryShard};
pub use pool::{PoolSettings, ShardPool};

use std::sync::Arc;

use crate::error::StoreError;
use crate::utils::config::StoreTimeouts;

/// An established connection to one shard.
///
/// `Send + Sync` is part of the contract: the pool hands one connection to every writer that
/// targets the shard, so only clients that are safe to share may implement this.
pub trait ShardConnection: Send + Sync {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
}

/// Opens connections. Injected into [`ShardPool`] so the pipeline never names a concrete store.
pub trait ShardConnector: Send + Sync {
    fn connect(
        &self,
        addr: &str,
        timeouts: &StoreTimeouts,
    ) -> Result<Arc<dyn ShardConnection>, StoreError>;
}
