use clap::Parser;
use std::path::PathBuf;

/// Bulk loader for installed-apps device logs into memcached shards.
#[derive(Clone, Debug, Parser)]
#[command(name = "appsload")]
#[command(about = "Load gzip TSV device logs into memcached shards; use --dry to log instead of writing.")]
pub struct Cli {
    /// Glob for input files. Default: /data/appsinstalled/*.tsv.gz
    #[arg(long)]
    pub pattern: Option<String>,

    /// Number of shard write workers. Default: one per CPU thread.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Capacity of the ingest -> write queue.
    #[arg(long)]
    pub queue_size: Option<usize>,

    /// Max input files streamed at once.
    #[arg(long)]
    pub max_open_files: Option<usize>,

    /// Shard address for idfa devices (host:port).
    #[arg(long)]
    pub idfa: Option<String>,

    /// Shard address for gaid devices (host:port).
    #[arg(long)]
    pub gaid: Option<String>,

    /// Shard address for adid devices (host:port).
    #[arg(long)]
    pub adid: Option<String>,

    /// Shard address for dvid devices (host:port).
    #[arg(long)]
    pub dvid: Option<String>,

    /// Log each record instead of writing it. Implies debug logging.
    #[arg(long)]
    pub dry: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, short = 'l')]
    pub log: Option<PathBuf>,

    /// Config file. Default: appsload.toml in the working directory, if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Retries per failed write (exponential backoff).
    #[arg(long)]
    pub retries: Option<u32>,

    /// Rename rejected files with the quarantine prefix instead of marking them done.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub quarantine: Option<bool>,

    /// Show a counter of written records.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Run the wire-format self check and exit.
    #[arg(long, short = 't')]
    pub test: bool,
}

impl Cli {
    /// Shard overrides given on the command line, by device type.
    pub fn shard_overrides(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("idfa", self.idfa.as_deref()),
            ("gaid", self.gaid.as_deref()),
            ("adid", self.adid.as_deref()),
            ("dvid", self.dvid.as_deref()),
        ]
        .into_iter()
        .filter_map(|(dev, addr)| addr.map(|a| (dev, a)))
    }
}
