use log::warn;

use crate::{IngestOutcome, LoadReport};

/// Log files that were not fully ingested and so were left unmarked for the next run.
/// Call after the run has been judged.
pub fn report_unfinished_files(report: &LoadReport) {
    let unfinished: Vec<_> = report
        .files
        .iter()
        .filter(|f| !f.outcome.is_complete())
        .collect();
    if unfinished.is_empty() {
        return;
    }
    warn!(
        "{} file(s) not fully ingested; left in place for the next run",
        unfinished.len()
    );
    for f in unfinished {
        match &f.outcome {
            IngestOutcome::Failed(msg) => warn!("  {}: {}", f.path.display(), msg),
            IngestOutcome::Cancelled => warn!("  {}: cancelled", f.path.display()),
            IngestOutcome::Complete => {}
        }
    }
}
