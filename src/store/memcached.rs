//! memcached shards via the `memcache` client over the ascii protocol.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;

use log::debug;

use super::{ShardConnection, ShardConnector};
use crate::error::StoreError;
use crate::utils::config::StoreTimeouts;

/// Items never expire.
const NO_EXPIRATION: u32 = 0;

/// Connector for real memcached shards.
///
/// Each shard gets one client holding `sockets_per_shard` pooled sockets, so that many writers can
/// have a `set` in flight on the same shard at once. Size it to the writer count.
#[derive(Clone, Copy, Debug)]
pub struct MemcacheConnector {
    sockets_per_shard: u32,
}

impl MemcacheConnector {
    pub fn new(sockets_per_shard: usize) -> Self {
        MemcacheConnector {
            sockets_per_shard: u32::try_from(sockets_per_shard.max(1)).unwrap_or(u32::MAX),
        }
    }

    pub fn sockets_per_shard(&self) -> u32 {
        self.sockets_per_shard
    }
}

impl Default for MemcacheConnector {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Client URL. `timeout` is applied to every socket the client opens (including ones it
/// re-creates later) as read and write timeout; `connect_timeout` bounds socket checkout.
fn client_url(addr: &str, timeouts: &StoreTimeouts) -> String {
    format!(
        "memcache://{}?protocol=ascii&timeout={}&connect_timeout={}",
        addr,
        timeouts.io.as_secs_f64(),
        timeouts.connect.as_secs_f64()
    )
}

struct MemcacheShard {
    addr: String,
    client: memcache::Client,
}

impl ShardConnection for MemcacheShard {
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.client
            .set(key, value, NO_EXPIRATION)
            .map_err(|e| StoreError::write(&self.addr, e))
    }
}

/// Resolve and open a plain TCP connection within the timeout, so a dead shard fails in
/// `connect` time rather than the client's own pool build wait.
fn probe(addr: &str, timeouts: &StoreTimeouts) -> Result<(), StoreError> {
    let sock = addr
        .to_socket_addrs()
        .map_err(|e| StoreError::connect(addr, e))?
        .next()
        .ok_or_else(|| StoreError::connect(addr, "address did not resolve"))?;
    TcpStream::connect_timeout(&sock, timeouts.connect)
        .map(drop)
        .map_err(|e| StoreError::connect(addr, e))
}

impl ShardConnector for MemcacheConnector {
    fn connect(
        &self,
        addr: &str,
        timeouts: &StoreTimeouts,
    ) -> Result<Arc<dyn ShardConnection>, StoreError> {
        probe(addr, timeouts)?;
        let url = client_url(addr, timeouts);
        let client = memcache::Client::with_pool_size(url.as_str(), self.sockets_per_shard)
            .map_err(|e| StoreError::connect(addr, e))?;
        debug!(
            "Opened memcache client to {} ({} sockets)",
            addr, self.sockets_per_shard
        );
        Ok(Arc::new(MemcacheShard {
            addr: addr.to_string(),
            client,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_url_carries_io_and_connect_timeouts() {
        let timeouts = StoreTimeouts {
            connect: Duration::from_millis(1500),
            io: Duration::from_secs(3),
        };
        assert_eq!(
            client_url("10.0.0.1:11211", &timeouts),
            "memcache://10.0.0.1:11211?protocol=ascii&timeout=3&connect_timeout=1.5"
        );
    }

    #[test]
    fn test_zero_sockets_is_clamped() {
        assert_eq!(MemcacheConnector::new(0).sockets_per_shard(), 1);
        assert_eq!(MemcacheConnector::new(8).sockets_per_shard(), 8);
    }
}
