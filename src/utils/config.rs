//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

use crate::BudgetBoundary;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!("{pkg}.toml"),
            }
        })
    }

    /// Config file looked up in the working directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Input ----

/// Default input glob.
pub const DEFAULT_PATTERN: &str = "/data/appsinstalled/*.tsv.gz";

/// Prefix that marks a file as loaded. Leading dot keeps it out of the default glob.
pub const DONE_PREFIX: &str = ".";

/// Prefix for rejected files under [`RejectPolicy::Quarantine`](crate::RejectPolicy::Quarantine).
pub const QUARANTINE_PREFIX: &str = ".rejected.";

// ---- Shards ----

/// Default shard per device type.
pub const DEFAULT_SHARDS: [(&str, &str); 4] = [
    ("idfa", "127.0.0.1:33013"),
    ("gaid", "127.0.0.1:33014"),
    ("adid", "127.0.0.1:33015"),
    ("dvid", "127.0.0.1:33016"),
];

/// Connection-level timeouts for a shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub connect: Duration,
    /// Read and write timeout on an established connection.
    pub io: Duration,
}

impl StoreTimeouts {
    pub const CONNECT_SECS: u64 = 5;
    pub const IO_SECS: u64 = 5;
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(Self::CONNECT_SECS),
            io: Duration::from_secs(Self::IO_SECS),
        }
    }
}

/// Seconds a shard stays marked dead after a failed connect.
pub const DEAD_RETRY_SECS: u64 = 20;

/// Initial delay between write retries (milliseconds).
pub const RETRY_BACKOFF_MS: u64 = 100;

// ---- Queue / workers ----

/// Capacity of the ingest -> write queue.
pub const QUEUE_SIZE: usize = 3000;

/// Thread limits for the write and ingest stages.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Floor for either stage.
    pub floor: usize,
    /// Upper bound for concurrently open input files.
    pub open_files_max: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
            open_files_max: Self::OPEN_FILES_MAX,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 1;
    pub const OPEN_FILES_MAX: usize = 8;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default write worker count: one per available thread.
    pub fn default_writers(&self) -> usize {
        self.all_threads.max(self.floor)
    }

    /// Default number of files streamed at once.
    pub fn default_open_files(&self) -> usize {
        self.all_threads.clamp(self.floor, self.open_files_max)
    }
}

/// Writers flush their per-file counters to the supervisor after this many jobs.
pub const STATS_FLUSH_EVERY: u64 = 1000;

/// How often the supervisor checks queue drainage and refreshes progress.
pub const SUPERVISOR_POLL: Duration = Duration::from_millis(100);

/// How often an ingest unit checks for cancellation (lines).
pub const CANCEL_CHECK_EVERY: u64 = 1024;

// ---- Error budget ----

/// Max tolerated ratio of errors to records before a file is rejected.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorBudget {
    pub max_rate: f64,
    pub boundary: BudgetBoundary,
}

impl ErrorBudget {
    pub const NORMAL_ERR_RATE: f64 = 0.01;
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self {
            max_rate: Self::NORMAL_ERR_RATE,
            boundary: BudgetBoundary::default(),
        }
    }
}
