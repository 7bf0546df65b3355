//! Pipeline context: queue items, worker reports, and the channels that carry them.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::engine::router::{ShardRoute, ShardWrite};
use crate::{AppsFallback, FileId, IngestOutcome, LoadCounters, Opts};

/// A routed record plus the file it came from.
#[derive(Debug)]
pub struct WriteJob {
    pub file: FileId,
    pub write: ShardWrite,
}

/// What travels on the shared queue.
#[derive(Debug)]
pub enum QueueItem {
    Job(WriteJob),
    /// Shutdown token. Pushed once by the supervisor; every writer that pops it pushes it back
    /// before exiting, so it passes through all N writers in turn.
    Shutdown,
}

/// Sent by an ingest unit when it is done with its file.
#[derive(Debug)]
pub struct IngestReport {
    pub file: FileId,
    /// Parse and route errors; `processed`/`write_errors` stay 0 here.
    pub counters: LoadCounters,
    /// Records pushed onto the queue.
    pub queued: u64,
    pub outcome: IngestOutcome,
}

/// Partial write-stage counters from one writer, keyed by file.
#[derive(Debug)]
pub struct WriterStats {
    pub worker: usize,
    pub per_file: HashMap<FileId, LoadCounters>,
    /// True on the writer's last flush.
    pub last: bool,
}

/// Read-only state every ingest unit needs.
#[derive(Clone)]
pub struct IngestContext {
    pub routes: Arc<ShardRoute>,
    pub apps_fallback: AppsFallback,
    pub queue_tx: Sender<QueueItem>,
    pub report_tx: Sender<IngestReport>,
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Channels for one run. The supervisor keeps both ends of the queue: it sends the sentinel
/// and drains it after the writers exit.
pub struct PipelineChannels {
    pub queue_tx: Sender<QueueItem>,
    pub queue_rx: Receiver<QueueItem>,
    pub report_tx: Sender<IngestReport>,
    pub report_rx: Receiver<IngestReport>,
    pub stats_tx: Sender<WriterStats>,
    pub stats_rx: Receiver<WriterStats>,
}

pub fn create_pipeline_channels(queue_size: usize) -> PipelineChannels {
    let (queue_tx, queue_rx) = bounded::<QueueItem>(queue_size.max(1));
    let (report_tx, report_rx) = unbounded::<IngestReport>();
    let (stats_tx, stats_rx) = unbounded::<WriterStats>();
    PipelineChannels {
        queue_tx,
        queue_rx,
        report_tx,
        report_rx,
        stats_tx,
        stats_rx,
    }
}

impl IngestContext {
    pub fn new(opts: &Opts, channels: &PipelineChannels) -> Self {
        IngestContext {
            routes: Arc::new(opts.routes.clone()),
            apps_fallback: opts.apps_fallback,
            queue_tx: channels.queue_tx.clone(),
            report_tx: channels.report_tx.clone(),
            cancel: opts.cancel.clone(),
        }
    }
}

/// Input file with its run-local id.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub id: FileId,
    pub path: PathBuf,
}
