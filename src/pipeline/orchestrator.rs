//! Load supervisor: discover files, run ingest units and writers, shut the writers down,
//! judge every file against the error budget, and mark it done.

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::budget::{judge, log_verdict};
use crate::engine::progress::{ProgressBar, create_counter, refresh_bar, update_progress_bar};
use crate::engine::tools::{discover_files, mark_file};
use crate::store::{PoolSettings, ShardConnector, ShardPool};
use crate::utils::config::{DONE_PREFIX, QUARANTINE_PREFIX, SUPERVISOR_POLL, WorkerThreadLimits};
use crate::utils::fd_limit::max_ingest_by_fd_limit;
use crate::{
    FileId, FileReport, IngestOutcome, LoadCounters, LoadReport, Opts, RejectPolicy, Verdict,
};

use super::context::{
    IngestContext, IngestReport, InputFile, QueueItem, WriterStats, create_pipeline_channels,
};
use super::error_handler::report_unfinished_files;
use super::ingest::{ingest_file, send_report};
use super::writer::spawn_writers;

/// Per-file counters merged from ingest reports and writer flushes.
#[derive(Default)]
struct Tally {
    counters: HashMap<FileId, LoadCounters>,
    outcomes: HashMap<FileId, IngestOutcome>,
}

impl Tally {
    fn add_ingest(&mut self, report: IngestReport) {
        self.counters
            .entry(report.file)
            .or_default()
            .merge(&report.counters);
        self.outcomes.insert(report.file, report.outcome);
    }

    fn add_writer(&mut self, stats: WriterStats) -> u64 {
        let mut n = 0;
        for (file, c) in stats.per_file {
            n += c.processed + c.write_errors;
            self.counters.entry(file).or_default().merge(&c);
        }
        n
    }

    /// Fold in every writer flush that has arrived so far.
    fn drain_writer_stats(&mut self, stats_rx: &Receiver<WriterStats>, bar: Option<&ProgressBar>) {
        for stats in stats_rx.try_iter() {
            let n = self.add_writer(stats);
            if let Some(bar) = bar {
                update_progress_bar(bar, n as usize);
            }
        }
    }
}

/// Files streamed at once: configured or derived from threads, capped by the FD limit and the
/// number of files.
fn ingest_parallelism(opts: &Opts, file_count: usize) -> usize {
    let wanted = opts
        .max_open_files
        .unwrap_or_else(|| WorkerThreadLimits::current().default_open_files());
    let capped = match max_ingest_by_fd_limit(opts.routes.len()) {
        Some(fd_cap) if fd_cap < wanted => {
            debug!("Capping open files {} -> {} (FD limit ~80%)", wanted, fd_cap);
            fd_cap
        }
        _ => wanted,
    };
    capped.clamp(1, file_count.max(1))
}

/// Send the shutdown token once, wait for every writer, then take the token back off the queue.
///
/// Must only be called once nothing else will be queued. Each writer re-pushes the token before
/// exiting, so after the joins exactly one token is left and the queue ends empty.
pub fn shutdown_writers(
    queue_tx: &Sender<QueueItem>,
    queue_rx: &Receiver<QueueItem>,
    handles: Vec<JoinHandle<()>>,
) -> Result<()> {
    queue_tx
        .send(QueueItem::Shutdown)
        .context("send shutdown token")?;
    let mut panicked = 0_usize;
    for h in handles {
        if h.join().is_err() {
            panicked += 1;
        }
    }
    while let Ok(item) = queue_rx.try_recv() {
        if let QueueItem::Job(job) = item {
            warn!("Job for {} left on queue after shutdown", job.write.key);
        }
    }
    if panicked > 0 {
        anyhow::bail!("{} writer thread(s) panicked", panicked);
    }
    Ok(())
}

/// Rename a fully ingested file according to its verdict and the reject policy.
fn mark_ingested(path: &Path, verdict: Verdict, policy: RejectPolicy) -> Option<PathBuf> {
    let prefix = match (verdict, policy) {
        (Verdict::Rejected, RejectPolicy::Quarantine) => QUARANTINE_PREFIX,
        _ => DONE_PREFIX,
    };
    match mark_file(path, prefix) {
        Ok(marked) => Some(marked),
        Err(e) => {
            log::error!("{:#}", e);
            None
        }
    }
}

/// Run one load: every file matching `opts.pattern` is streamed, written through `connector`,
/// judged against the error budget and marked. Per-file failures are reported, not returned;
/// the error path is reserved for run-level problems (bad pattern, thread panics).
///
/// The completion rename happens after a file has been fully ingested, so it does not claim the
/// file while it is being read. Two runs started over the same directory before either one
/// finishes will both load the same files. Run one loader per input directory at a time.
pub fn run_load(opts: &Opts, connector: Arc<dyn ShardConnector>) -> Result<LoadReport> {
    let paths = discover_files(&opts.pattern)?;
    if paths.is_empty() {
        info!("No files match {}", opts.pattern);
        return Ok(LoadReport::default());
    }
    let files: Vec<InputFile> = paths
        .into_iter()
        .enumerate()
        .map(|(id, path)| InputFile { id, path })
        .collect();
    let workers = opts.workers.max(1);
    let parallelism = ingest_parallelism(opts, files.len());
    info!(
        "Loading {} file(s) with {} writer(s), {} file(s) at a time, queue size {}",
        files.len(),
        workers,
        parallelism,
        opts.queue_size
    );
    for (device_type, addr) in opts.routes.iter() {
        debug!("Shard {} -> {}", device_type, addr);
    }

    let channels = create_pipeline_channels(opts.queue_size);
    let pool = Arc::new(ShardPool::new(connector, PoolSettings::from(opts)));
    let writer_handles = spawn_writers(
        workers,
        &channels.queue_tx,
        &channels.queue_rx,
        &pool,
        &channels.stats_tx,
    );

    let ingest_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallelism)
        .thread_name(|i| format!("ingest-{i}"))
        .build()
        .context("build ingest thread pool")?;
    let ctx = IngestContext::new(opts, &channels);
    for file in &files {
        let file = file.clone();
        let ctx = ctx.clone();
        ingest_pool.spawn(move || {
            let report = ingest_file(&file, &ctx);
            send_report(report, &ctx);
        });
    }
    drop(ctx);

    let bar = opts.progress.then(|| {
        let b = create_counter("Loading");
        refresh_bar(&b);
        b
    });
    let mut tally = Tally::default();

    // Wait for every ingest unit.
    let mut reported = 0_usize;
    while reported < files.len() {
        match channels.report_rx.recv_timeout(SUPERVISOR_POLL) {
            Ok(report) => {
                debug!(
                    "Ingest finished for {} ({:?}, {} queued)",
                    files[report.file].path.display(),
                    report.outcome,
                    report.queued
                );
                tally.add_ingest(report);
                reported += 1;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("ingest report channel closed early");
            }
        }
        tally.drain_writer_stats(&channels.stats_rx, bar.as_ref());
    }
    drop(ingest_pool);

    // Wait for the writers to drain what is queued.
    while !channels.queue_rx.is_empty() {
        tally.drain_writer_stats(&channels.stats_rx, bar.as_ref());
        thread::sleep(SUPERVISOR_POLL);
    }
    debug!("Queue drained; stopping writers");
    shutdown_writers(&channels.queue_tx, &channels.queue_rx, writer_handles)?;
    tally.drain_writer_stats(&channels.stats_rx, bar.as_ref());
    if bar.is_some() {
        eprintln!();
    }

    let report = finish(files, tally, opts);
    report_unfinished_files(&report);
    info!(
        "Done: {} file(s), processed={} parse_errors={} route_errors={} write_errors={}",
        report.files.len(),
        report.totals.processed,
        report.totals.parse_errors,
        report.totals.route_errors,
        report.totals.write_errors
    );
    Ok(report)
}

/// Judge and mark every file, in discovery order.
fn finish(files: Vec<InputFile>, mut tally: Tally, opts: &Opts) -> LoadReport {
    let mut report = LoadReport::default();
    for file in files {
        let counters = tally.counters.remove(&file.id).unwrap_or_default();
        let outcome = tally
            .outcomes
            .remove(&file.id)
            .unwrap_or_else(|| IngestOutcome::Failed("no ingest report".to_string()));
        report.totals.merge(&counters);

        let (verdict, marked_as) = if outcome.is_complete() {
            let verdict = judge(&counters, &opts.budget);
            log_verdict(&file.path, &counters, &opts.budget, verdict);
            let marked = mark_ingested(&file.path, verdict, opts.reject_policy);
            (Some(verdict), marked)
        } else {
            (None, None)
        };

        report.files.push(FileReport {
            path: file.path,
            marked_as,
            counters,
            outcome,
            verdict,
        });
    }
    report
}
