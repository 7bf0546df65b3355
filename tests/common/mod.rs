//! Shared fixtures: gzip input files, scratch dirs, and options wired to in-memory shards.

#![allow(dead_code)]

use appsload::engine::ShardRoute;
use appsload::{InstallRecord, Opts};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const IDFA_ADDR: &str = "mem-idfa:11211";
pub const GAID_ADDR: &str = "mem-gaid:11211";

/// Scratch dir whose name has no leading dot, so patterns under it glob normally.
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("appsload-test")
        .tempdir()
        .unwrap()
}

pub fn write_gz(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    for line in lines {
        writeln!(enc, "{line}").unwrap();
    }
    enc.finish().unwrap();
    path
}

/// Two shards (idfa, gaid); adid/dvid deliberately unrouted.
pub fn test_routes() -> ShardRoute {
    let mut routes = ShardRoute::empty();
    routes.set("idfa", IDFA_ADDR);
    routes.set("gaid", GAID_ADDR);
    routes
}

pub fn test_opts(dir: &Path) -> Opts {
    Opts {
        pattern: format!("{}/*.tsv.gz", dir.display()),
        routes: test_routes(),
        workers: 3,
        queue_size: 8,
        max_open_files: Some(2),
        ..Opts::default()
    }
}

pub fn record(device_type: &str, device_id: &str, lat: f64, lon: f64, apps: &[u32]) -> InstallRecord {
    InstallRecord {
        device_type: device_type.to_string(),
        device_id: device_id.to_string(),
        lat,
        lon,
        apps: apps.to_vec(),
    }
}
