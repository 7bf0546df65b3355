use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Init the global logger: dependencies at warn, this crate at info (debug when `verbose`).
/// With `log_file`, lines are appended there uncolored and timestamped; otherwise stderr.
pub fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::from_default_env();
    builder
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level); // Our crate: use requested level

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        colored::control::set_override(false);
        builder.target(Target::Pipe(Box::new(file))).format(|buf, record| {
            let level = record.level().as_str().chars().next().unwrap_or('?');
            writeln!(buf, "[{}] {} {}", buf.timestamp_millis(), level, record.args())
        });
    } else {
        builder.format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        });
    }

    builder
        .try_init()
        .context("logger already initialized")?;
    Ok(())
}
