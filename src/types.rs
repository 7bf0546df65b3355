//! Public and internal types for the appsload API and pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::engine::router::ShardRoute;
use crate::utils::config::{ErrorBudget, StoreTimeouts};

/// One parsed input line. Identity fields are never empty; coordinates are always finite.
#[derive(Clone, Debug, PartialEq)]
pub struct InstallRecord {
    pub device_type: String,
    pub device_id: String,
    pub lat: f64,
    pub lon: f64,
    pub apps: Vec<u32>,
}

impl InstallRecord {
    /// Storage key: `device_type:device_id`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.device_type, self.device_id)
    }
}

/// Index of a file in the run's discovery order. Travels with every queued job so writers can
/// attribute results to the file that produced them.
pub type FileId = usize;

/// Per-file (or per-run) counters. Owned by exactly one worker until handed to the supervisor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadCounters {
    /// Records written to a shard.
    pub processed: u64,
    /// Lines rejected by the parser.
    pub parse_errors: u64,
    /// Records whose device type has no shard.
    pub route_errors: u64,
    /// Records the shard did not accept (connect failure, timeout, remote rejection).
    pub write_errors: u64,
}

impl LoadCounters {
    pub fn errors(&self) -> u64 {
        self.parse_errors + self.route_errors + self.write_errors
    }

    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &LoadCounters) {
        self.processed += other.processed;
        self.parse_errors += other.parse_errors;
        self.route_errors += other.route_errors;
        self.write_errors += other.write_errors;
    }

    /// `errors / (processed + errors)`, with an empty file counting as rate 0.
    pub fn error_rate(&self) -> f64 {
        let errors = self.errors();
        let total = (self.processed + errors).max(1);
        errors as f64 / total as f64
    }
}

/// Accept/reject classification of a file against the error budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// How far an ingest unit got through its file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Stream read to the end.
    Complete,
    /// Could not open or read the file; message explains why.
    Failed(String),
    /// Stopped early on a cancel request.
    Cancelled,
}

impl IngestOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, IngestOutcome::Complete)
    }
}

/// Final accounting for one input file.
#[derive(Clone, Debug)]
pub struct FileReport {
    /// Path the file was discovered at.
    pub path: PathBuf,
    /// Path after the completion rename, or `None` when the file was left in place.
    pub marked_as: Option<PathBuf>,
    pub counters: LoadCounters,
    pub outcome: IngestOutcome,
    /// `None` when the file was not fully ingested and so never judged.
    pub verdict: Option<Verdict>,
}

/// Result of one supervisor run.
#[derive(Clone, Debug, Default)]
pub struct LoadReport {
    pub files: Vec<FileReport>,
    pub totals: LoadCounters,
}

/// What to do with the apps field when some entries are not integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppsFallback {
    /// Keep the entries that parse, drop the rest.
    #[default]
    KeepNumeric,
    /// Drop every entry of the line.
    DropAll,
}

/// Where the error budget boundary falls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BudgetBoundary {
    /// `rate <= budget` is accepted.
    #[default]
    Inclusive,
    /// `rate < budget` is accepted.
    Exclusive,
}

/// What to do with a fully ingested file whose error rate exceeded the budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RejectPolicy {
    /// Mark it done like an accepted file.
    #[default]
    MarkDone,
    /// Rename it with the quarantine prefix instead.
    Quarantine,
}

/// Full options for a load run (CLI and lib).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Glob for input files. Hidden (dot-prefixed) files never match.
    pub pattern: String,
    /// Device type -> shard address.
    pub routes: ShardRoute,
    /// Number of shard write workers.
    pub workers: usize,
    /// Capacity of the queue between ingest and write stages.
    pub queue_size: usize,
    /// Max files streamed at once. When None, derived from thread count and FD limit.
    pub max_open_files: Option<usize>,
    pub apps_fallback: AppsFallback,
    pub budget: ErrorBudget,
    pub reject_policy: RejectPolicy,
    pub timeouts: StoreTimeouts,
    /// Extra attempts per write after the first fails.
    pub retries: u32,
    /// Initial delay between retries; doubles each attempt.
    pub retry_backoff: Duration,
    /// Skip reconnect attempts to a shard for this long after a failed connect.
    pub dead_retry: Duration,
    /// Show a counter of written records.
    pub progress: bool,
    /// Set by a signal handler to stop ingest early.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for Opts {
    fn default() -> Self {
        use crate::utils::config::{
            DEAD_RETRY_SECS, DEFAULT_PATTERN, QUEUE_SIZE, RETRY_BACKOFF_MS, WorkerThreadLimits,
        };
        Opts {
            pattern: DEFAULT_PATTERN.to_string(),
            routes: ShardRoute::default(),
            workers: WorkerThreadLimits::current().default_writers(),
            queue_size: QUEUE_SIZE,
            max_open_files: None,
            apps_fallback: AppsFallback::default(),
            budget: ErrorBudget::default(),
            reject_policy: RejectPolicy::default(),
            timeouts: StoreTimeouts::default(),
            retries: 0,
            retry_backoff: Duration::from_millis(RETRY_BACKOFF_MS),
            dead_retry: Duration::from_secs(DEAD_RETRY_SECS),
            progress: false,
            cancel: None,
        }
    }
}
