//! Ingest unit: stream one gzip file, parse and route each line, push jobs onto the queue.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use log::{debug, error, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::Ordering;

use crate::engine::parser::parse_line;
use crate::engine::router::ShardWrite;
use crate::error::{ParseError, RouteError};
use crate::utils::config::CANCEL_CHECK_EVERY;
use crate::{IngestOutcome, LoadCounters};

use super::context::{IngestContext, IngestReport, InputFile, QueueItem, WriteJob};

/// Per-line failure, kept apart so parse and route errors are counted separately.
enum LineError {
    Parse(ParseError),
    Route(RouteError),
}

/// Running totals for the file being streamed.
#[derive(Default)]
struct StreamState {
    counters: LoadCounters,
    queued: u64,
    lines: u64,
}

/// Stream `file` to the end and report. Never panics on bad data: open/read failures end this
/// file only and come back as [`IngestOutcome::Failed`].
pub fn ingest_file(file: &InputFile, ctx: &IngestContext) -> IngestReport {
    debug!("Processing {}", file.path.display());
    let mut state = StreamState::default();
    let outcome = match stream_file(file, ctx, &mut state) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error reading file {}: {:#}", file.path.display(), e);
            IngestOutcome::Failed(format!("{e:#}"))
        }
    };
    debug!(
        "{}: {} lines read, {} queued, {} parse errors, {} route errors",
        file.path.display(),
        state.lines,
        state.queued,
        state.counters.parse_errors,
        state.counters.route_errors
    );
    IngestReport {
        file: file.id,
        counters: state.counters,
        queued: state.queued,
        outcome,
    }
}

/// Report to the supervisor. A closed report channel means the supervisor is gone; nothing to do.
pub fn send_report(report: IngestReport, ctx: &IngestContext) {
    let _ = ctx.report_tx.send(report);
}

fn cancel_requested(ctx: &IngestContext) -> bool {
    ctx.cancel
        .as_ref()
        .is_some_and(|c| c.load(Ordering::Relaxed))
}

fn stream_file(
    file: &InputFile,
    ctx: &IngestContext,
    state: &mut StreamState,
) -> Result<IngestOutcome> {
    let fd = File::open(&file.path).with_context(|| format!("open {}", file.path.display()))?;
    let mut reader = BufReader::new(MultiGzDecoder::new(fd));
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("read line {}", state.lines + 1))?;
        if n == 0 {
            return Ok(IngestOutcome::Complete);
        }
        state.lines += 1;
        if state.lines.is_multiple_of(CANCEL_CHECK_EVERY) && cancel_requested(ctx) {
            warn!(
                "{}: cancelled after {} lines",
                file.path.display(),
                state.lines
            );
            return Ok(IngestOutcome::Cancelled);
        }
        if line.trim_ascii().is_empty() {
            continue;
        }
        match process_line(&line, ctx) {
            Ok(write) => {
                let job = QueueItem::Job(WriteJob {
                    file: file.id,
                    write,
                });
                // Blocks while the queue is full.
                ctx.queue_tx
                    .send(job)
                    .map_err(|_| anyhow::anyhow!("write queue closed"))?;
                state.queued += 1;
            }
            Err(LineError::Parse(e)) => {
                debug!("{} line {}: {}", file.path.display(), state.lines, e);
                state.counters.parse_errors += 1;
            }
            Err(LineError::Route(e)) => {
                warn!("{} line {}: {}", file.path.display(), state.lines, e);
                state.counters.route_errors += 1;
            }
        }
    }
}

fn process_line(line: &[u8], ctx: &IngestContext) -> Result<ShardWrite, LineError> {
    let record = parse_line(line, ctx.apps_fallback).map_err(LineError::Parse)?;
    ctx.routes.route(&record).map_err(LineError::Route)
}
