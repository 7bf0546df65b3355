pub mod config;
pub mod fd_limit;
pub mod loader_toml;
pub mod logger;

pub use config::*;
pub use fd_limit::{FDS_PER_INGEST, max_ingest_by_fd_limit, max_open_fds};
pub use logger::setup_logging;
