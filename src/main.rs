//! appsload CLI: load device-install logs into memcached shards; use --dry to log only.

use anyhow::Result;
use appsload::engine::arg_parser::Cli;
use appsload::engine::handle_run;
use clap::Parser;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let result = handle_run(&cli);
    log::info!("Time elapsed: {:?}", start_time.elapsed());
    result
}
