//! Progress counter for records written during a load

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Counter with no known total (files are streamed, line counts are not known up front).
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " records"
    )))
}

/// Advance the counter by `n`. Skips the update if the bar is contended; the next one catches up.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Force a refresh (e.g. so the counter shows "0 records" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}
