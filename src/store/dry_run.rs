//! Dry run: log every write at debug level instead of sending it.

use std::sync::Arc;

use log::debug;

use super::{ShardConnection, ShardConnector};
use crate::engine::wire;
use crate::error::StoreError;
use crate::utils::config::StoreTimeouts;

#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunConnector;

struct DryRunShard {
    addr: String,
}

impl ShardConnection for DryRunShard {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        debug!("{} - {} -> {}", self.addr, key, wire::describe(value));
        Ok(())
    }
}

impl ShardConnector for DryRunConnector {
    fn connect(
        &self,
        addr: &str,
        _timeouts: &StoreTimeouts,
    ) -> Result<Arc<dyn ShardConnection>, StoreError> {
        Ok(Arc::new(DryRunShard {
            addr: addr.to_string(),
        }))
    }
}
