//! Engine module: parsing, routing, wire format, budget, and the CLI front end

pub mod arg_parser;
pub mod budget;
pub mod cli;
pub mod parser;
pub mod progress;
pub mod router;
pub mod tools;
pub mod wire;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use budget::judge;
pub use cli::handle_run;
pub use parser::parse_line;
pub use router::{ShardRoute, ShardWrite};
pub use tools::{discover_files, mark_file, marked_path_for};
pub use wire::{UserApps, decode, encode};
