//! Static device-type routing and serialization of records into shard writes.

use std::collections::BTreeMap;

use crate::InstallRecord;
use crate::engine::wire;
use crate::error::RouteError;
use crate::utils::config::DEFAULT_SHARDS;

/// Device type -> shard address (`host:port`). Addresses may repeat across types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardRoute {
    routes: BTreeMap<String, String>,
}

impl Default for ShardRoute {
    fn default() -> Self {
        DEFAULT_SHARDS
            .iter()
            .map(|(dev, addr)| (dev.to_string(), addr.to_string()))
            .collect()
    }
}

impl FromIterator<(String, String)> for ShardRoute {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ShardRoute {
            routes: iter.into_iter().collect(),
        }
    }
}

impl ShardRoute {
    /// Empty table; every record is a routing error until shards are added.
    pub fn empty() -> Self {
        ShardRoute {
            routes: BTreeMap::new(),
        }
    }

    /// Add or replace the shard for `device_type`.
    pub fn set(&mut self, device_type: impl Into<String>, addr: impl Into<String>) {
        self.routes.insert(device_type.into(), addr.into());
    }

    pub fn addr_for(&self, device_type: &str) -> Option<&str> {
        self.routes.get(device_type).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve the shard for `rec` and serialize it. Pure.
    pub fn route(&self, rec: &InstallRecord) -> Result<ShardWrite, RouteError> {
        let addr = self
            .addr_for(&rec.device_type)
            .ok_or_else(|| RouteError::unknown_device_type(&rec.device_type))?;
        Ok(ShardWrite {
            shard: rec.device_type.clone(),
            addr: addr.to_string(),
            key: rec.key(),
            payload: wire::encode(rec),
        })
    }
}

/// A routed, serialized record ready for the shard pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardWrite {
    /// Shard identity (the device type); connection pool key.
    pub shard: String,
    pub addr: String,
    pub key: String,
    pub payload: Vec<u8>,
}
