//! Shard writers: drain the queue into the connection pool until the shutdown token arrives.

use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::store::ShardPool;
use crate::utils::config::STATS_FLUSH_EVERY;
use crate::{FileId, LoadCounters};

use super::context::{QueueItem, WriterStats};

/// Everything one writer thread owns.
struct Writer {
    id: usize,
    queue_tx: Sender<QueueItem>,
    queue_rx: Receiver<QueueItem>,
    pool: Arc<ShardPool>,
    stats_tx: Sender<WriterStats>,
    per_file: HashMap<FileId, LoadCounters>,
}

impl Writer {
    fn run(mut self) {
        let mut since_flush = 0_u64;
        while let Ok(item) = self.queue_rx.recv() {
            match item {
                QueueItem::Job(job) => {
                    let w = &job.write;
                    let ok = self.pool.write(&w.shard, &w.addr, &w.key, &w.payload);
                    let counters = self.per_file.entry(job.file).or_default();
                    if ok {
                        counters.processed += 1;
                    } else {
                        counters.write_errors += 1;
                    }
                    since_flush += 1;
                    if since_flush >= STATS_FLUSH_EVERY {
                        self.flush(false);
                        since_flush = 0;
                    }
                }
                QueueItem::Shutdown => {
                    // Hand the token to the next writer. Nothing else is queued at this point,
                    // so there is always room and this never blocks.
                    let _ = self.queue_tx.send(QueueItem::Shutdown);
                    break;
                }
            }
        }
        self.flush(true);
        debug!("Writer {} stopped", self.id);
    }

    fn flush(&mut self, last: bool) {
        if self.per_file.is_empty() && !last {
            return;
        }
        let _ = self.stats_tx.send(WriterStats {
            worker: self.id,
            per_file: std::mem::take(&mut self.per_file),
            last,
        });
    }
}

/// Spawn `count` writers sharing `pool`. Each reports per-file counters on `stats_tx` every
/// [`STATS_FLUSH_EVERY`] jobs and once more on exit.
pub fn spawn_writers(
    count: usize,
    queue_tx: &Sender<QueueItem>,
    queue_rx: &Receiver<QueueItem>,
    pool: &Arc<ShardPool>,
    stats_tx: &Sender<WriterStats>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            debug!("Starting writer {}", id);
            let writer = Writer {
                id,
                queue_tx: queue_tx.clone(),
                queue_rx: queue_rx.clone(),
                pool: Arc::clone(pool),
                stats_tx: stats_tx.clone(),
                per_file: HashMap::new(),
            };
            thread::spawn(move || writer.run())
        })
        .collect()
}
