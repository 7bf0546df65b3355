//! CLI command handler: load by default; --dry logs records instead of writing; --test self-checks.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::engine::wire::self_check;
use crate::pipeline::run_load;
use crate::store::{DryRunConnector, MemcacheConnector, ShardConnector};
use crate::utils::config::PackagePaths;
use crate::utils::loader_toml::{apply_file_to_opts, load_loader_toml};
use crate::utils::setup_logging;
use crate::{Opts, RejectPolicy, Verdict};

/// Defaults, then the config file, then CLI flags.
fn setup_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();

    let config_path = match &cli.config {
        Some(p) => Some(p.clone()),
        None => {
            let p = PathBuf::from(PackagePaths::get().config_filename());
            p.is_file().then_some(p)
        }
    };
    if let Some(path) = config_path {
        let file = load_loader_toml(&path)?;
        apply_file_to_opts(&file, &mut opts)
            .with_context(|| format!("apply config {}", path.display()))?;
        debug!("Applied config from {}", path.display());
    }

    if let Some(ref p) = cli.pattern {
        opts.pattern = p.clone();
    }
    if let Some(n) = cli.workers {
        opts.workers = n;
    }
    if let Some(n) = cli.queue_size {
        opts.queue_size = n;
    }
    if let Some(n) = cli.max_open_files {
        opts.max_open_files = Some(n);
    }
    if let Some(n) = cli.retries {
        opts.retries = n;
    }
    for (dev, addr) in cli.shard_overrides() {
        opts.routes.set(dev, addr);
    }
    if cli.quarantine.unwrap_or(false) {
        opts.reject_policy = RejectPolicy::Quarantine;
    }
    opts.progress = cli.progress.unwrap_or(false);
    Ok(opts)
}

/// Install a Ctrl+C handler that asks ingest units to stop.
fn install_cancel_handler() -> Result<Arc<AtomicBool>> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel_requested)
}

/// Run a load (or the self check) as described by `cli`.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let verbose = cli.verbose.unwrap_or(false) || cli.dry;
    setup_logging(verbose, cli.log.as_deref())?;

    if cli.test {
        self_check()?;
        info!("Wire format self check passed");
        return Ok(());
    }

    let mut opts = setup_opts(cli)?;
    opts.cancel = Some(install_cancel_handler()?);
    info!("Starting loader with options: {:?}", opts);

    let connector: Arc<dyn ShardConnector> = if cli.dry {
        warn!("RUNNING IN DRY MODE. NOTHING WILL BE WRITTEN TO THE SHARDS.");
        Arc::new(DryRunConnector)
    } else {
        Arc::new(MemcacheConnector::new(opts.workers))
    };

    let report = run_load(&opts, connector)?;
    let rejected = report
        .files
        .iter()
        .filter(|f| f.verdict == Some(Verdict::Rejected))
        .count();
    if rejected > 0 {
        warn!("{} of {} file(s) over the error budget", rejected, report.files.len());
    }
    if opts
        .cancel
        .as_ref()
        .is_some_and(|c| c.load(Ordering::Relaxed))
    {
        anyhow::bail!("Load cancelled by user; unfinished files were left in place");
    }
    Ok(())
}
