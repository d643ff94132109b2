//! Pipeline components: queues, stages, workers, orchestration and the end-of-run report.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod queue;
pub mod stage;
pub mod workers;

pub use context::{
    Counters, PipelineChannels, PipelineContext, PipelineStats, create_pipeline_channels,
};
pub use error_handler::report_pipeline_stats;
pub use orchestrator::{
    PipelineHandles, collect_windows, finish_pipeline, run_pipeline, run_pipeline_with_stdin,
};
pub use queue::Stopped;
pub use stage::Stage;
pub use workers::{chunk_file, chunk_worker_loop, window_chunk, window_worker_loop};
