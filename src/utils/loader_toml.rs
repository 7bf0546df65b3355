//! Load `appsload.toml` (CLI only). The library takes a ready [`Opts`]; this file only feeds the CLI.
//!
//! ```toml
//! [settings]
//! pattern = "/data/appsinstalled/*.tsv.gz"
//! workers = 8
//! retries = 2
//!
//! [shards]
//! idfa = "10.0.0.1:11211"
//! gaid = "10.0.0.2:11211"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{AppsFallback, BudgetBoundary, Opts, RejectPolicy};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoaderToml {
    #[serde(default)]
    settings: SettingsSection,
    /// Device type -> `host:port`. Replaces the built-in shard table when present.
    #[serde(default)]
    shards: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    pattern: Option<String>,
    workers: Option<usize>,
    queue_size: Option<usize>,
    max_open_files: Option<usize>,
    /// Keep numeric app ids when some are not (default true).
    keep_numeric_apps: Option<bool>,
    error_budget: Option<f64>,
    /// Accept a file whose error rate equals the budget (default true).
    budget_inclusive: Option<bool>,
    quarantine_rejected: Option<bool>,
    connect_timeout_secs: Option<f64>,
    io_timeout_secs: Option<f64>,
    retries: Option<u32>,
    retry_backoff_ms: Option<u64>,
    dead_retry_secs: Option<u64>,
}

/// Read and parse the config at `path`. Unlike a missing default file, an explicit path that
/// cannot be read or parsed is an error.
pub(crate) fn load_loader_toml(path: &Path) -> Result<LoaderToml> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse config {}", path.display()))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// Seconds from the config file as a [`Duration`]; negative, NaN or out-of-range values are errors.
fn secs_setting(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid {name} = {secs}"))
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &LoaderToml, opts: &mut Opts) -> Result<()> {
    let s = &file.settings;
    apply_file_opt!(s, opts, pattern => pattern);
    apply_file_opt!(s, opts, workers => workers);
    apply_file_opt!(s, opts, queue_size => queue_size);
    apply_file_opt!(s, opts, retries => retries);
    if let Some(n) = s.max_open_files {
        opts.max_open_files = Some(n);
    }
    if let Some(keep) = s.keep_numeric_apps {
        opts.apps_fallback = if keep {
            AppsFallback::KeepNumeric
        } else {
            AppsFallback::DropAll
        };
    }
    if let Some(rate) = s.error_budget {
        opts.budget.max_rate = rate;
    }
    if let Some(inclusive) = s.budget_inclusive {
        opts.budget.boundary = if inclusive {
            BudgetBoundary::Inclusive
        } else {
            BudgetBoundary::Exclusive
        };
    }
    if let Some(true) = s.quarantine_rejected {
        opts.reject_policy = RejectPolicy::Quarantine;
    }
    if let Some(secs) = s.connect_timeout_secs {
        opts.timeouts.connect = secs_setting("connect_timeout_secs", secs)?;
    }
    if let Some(secs) = s.io_timeout_secs {
        opts.timeouts.io = secs_setting("io_timeout_secs", secs)?;
    }
    if let Some(ms) = s.retry_backoff_ms {
        opts.retry_backoff = Duration::from_millis(ms);
    }
    if let Some(secs) = s.dead_retry_secs {
        opts.dead_retry = Duration::from_secs(secs);
    }
    if let Some(ref shards) = file.shards {
        opts.routes = shards
            .iter()
            .map(|(dev, addr)| (dev.clone(), addr.clone()))
            .collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_file_overrides_only_present_fields() {
        let file: LoaderToml = toml::from_str(
            r#"
            [settings]
            workers = 3
            budget_inclusive = false
            quarantine_rejected = true

            [shards]
            idfa = "10.0.0.1:11211"
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        let queue_size = opts.queue_size;
        apply_file_to_opts(&file, &mut opts).unwrap();

        assert_eq!(opts.workers, 3);
        assert_eq!(opts.queue_size, queue_size);
        assert_eq!(opts.budget.boundary, BudgetBoundary::Exclusive);
        assert_eq!(opts.reject_policy, RejectPolicy::Quarantine);
        assert_eq!(opts.routes.len(), 1);
        assert_eq!(opts.routes.addr_for("idfa"), Some("10.0.0.1:11211"));
        assert_eq!(opts.routes.addr_for("gaid"), None);
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        for value in ["-1.0", "nan", "1e300"] {
            let file: LoaderToml =
                toml::from_str(&format!("[settings]\nconnect_timeout_secs = {value}\n")).unwrap();
            let mut opts = Opts::default();
            let err = apply_file_to_opts(&file, &mut opts).unwrap_err();
            assert!(err.to_string().contains("connect_timeout_secs"), "{err}");
            assert_eq!(opts.timeouts, crate::utils::config::StoreTimeouts::default());
        }

        let file: LoaderToml = toml::from_str("[settings]\nio_timeout_secs = -0.5\n").unwrap();
        assert!(apply_file_to_opts(&file, &mut Opts::default()).is_err());

        let file: LoaderToml = toml::from_str("[settings]\nio_timeout_secs = 2.5\n").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts).unwrap();
        assert_eq!(opts.timeouts.io, Duration::from_millis(2500));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let parsed: std::result::Result<LoaderToml, _> = toml::from_str("[settings]\nwokers = 3\n");
        assert!(parsed.is_err());
    }
}
