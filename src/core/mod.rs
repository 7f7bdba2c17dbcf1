//! Core logger types and traits

pub mod config;
pub mod error;
pub mod global;
pub mod level_table;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod pipeline;
pub mod sampling;
pub mod sink;
pub mod timestamp;

pub use config::{ConsoleSinkConfig, ConsoleStream, FileSinkConfig, LoggerConfig};
pub use error::{stderr_handler, ErrorHandler, LoggerError, Result};
pub use global::{global, set_global, shutdown_global};
pub use level_table::LevelTable;
pub use log_context::{FieldValue, LogContext};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use output_format::OutputFormat;
pub use pipeline::{OverflowCallback, DEFAULT_QUEUE_CAPACITY};
pub use sampling::{RateSampler, SamplerMetrics};
pub use sink::Sink;
pub use timestamp::TimestampFormat;
