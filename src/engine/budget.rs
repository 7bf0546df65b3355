//! Error-budget verdict for a file's counters.

use log::{error, info};
use std::path::Path;

use crate::utils::config::ErrorBudget;
use crate::{BudgetBoundary, LoadCounters, Verdict};

/// Classify `counters` against `budget`.
pub fn judge(counters: &LoadCounters, budget: &ErrorBudget) -> Verdict {
    let rate = counters.error_rate();
    let accepted = match budget.boundary {
        BudgetBoundary::Inclusive => rate <= budget.max_rate,
        BudgetBoundary::Exclusive => rate < budget.max_rate,
    };
    if accepted {
        Verdict::Accepted
    } else {
        Verdict::Rejected
    }
}

/// Log the verdict for `path`: info when accepted, error when rejected.
pub fn log_verdict(path: &Path, counters: &LoadCounters, budget: &ErrorBudget, verdict: Verdict) {
    let rate = counters.error_rate();
    match verdict {
        Verdict::Accepted => info!(
            "{}: acceptable error rate ({:.5}). Successful load (processed={} errors={})",
            path.display(),
            rate,
            counters.processed,
            counters.errors()
        ),
        Verdict::Rejected => error!(
            "{}: high error rate ({:.5} > {:.5}). Failed load (processed={} parse={} route={} write={})",
            path.display(),
            rate,
            budget.max_rate,
            counters.processed,
            counters.parse_errors,
            counters.route_errors,
            counters.write_errors
        ),
    }
}
