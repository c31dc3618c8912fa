pub mod audio;
pub mod classifier;
pub mod config;
mod logging;
pub mod mode;
pub mod pipeline;
pub mod protocol;
pub mod sink;
mod telemetry;
pub mod vote;

pub use logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use pipeline::{PipelineContext, PipelineIo, TickReport};
pub use telemetry::init_tracing;
pub use vote::PageCommand;
