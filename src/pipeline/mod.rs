//! Pipeline components: queue context, ingest units, shard writers, supervisor.

pub mod context;
pub mod error_handler;
pub mod ingest;
pub mod orchestrator;
pub mod writer;

pub use context::{
    IngestContext, IngestReport, InputFile, PipelineChannels, QueueItem, WriteJob, WriterStats,
    create_pipeline_channels,
};
pub use error_handler::report_unfinished_files;
pub use ingest::{ingest_file, send_report};
pub use orchestrator::{run_load, shutdown_writers};
pub use writer::spawn_writers;
