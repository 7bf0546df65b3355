//! appsload: bulk loader for installed-apps device logs into sharded memcached

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use error::{ParseError, RouteError, StoreError};

use log::debug;
use std::sync::Arc;

use store::ShardConnector;

/// Result alias used by public appsload API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: load every file matching `opts.pattern` into the shards reached through
/// `connector`, and return per-file counters and verdicts.
///
/// - Use [`store::MemcacheConnector`] for real shards, [`store::DryRunConnector`] to only log,
///   or [`store::MemoryConnector`] to keep everything in process.
/// - Files that were fully ingested are renamed with a leading `.` (or quarantined, per
///   [`Opts::reject_policy`]), so calling this again over the same directory skips them.
///
/// ```ignore
/// let opts = appsload::Opts { pattern: "/data/appsinstalled/*.tsv.gz".into(), ..Default::default() };
/// let report = appsload::load(&opts, std::sync::Arc::new(appsload::store::MemcacheConnector::new(opts.workers)))?;
/// ```
pub fn load(opts: &Opts, connector: Arc<dyn ShardConnector>) -> Result<LoadReport> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    pipeline::run_load(opts, connector)
}
