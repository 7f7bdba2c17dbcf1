//! # vlog
//!
//! A structured, asynchronous logging library with leveled output,
//! per-component thresholds, keyed rate sampling and size-rotated files.
//!
//! ## Features
//!
//! - **Non-blocking**: log calls enqueue into a bounded queue drained by
//!   one dispatcher thread; under overload entries are dropped and counted
//! - **Ten severity levels** from `Emergency` to `Trace`, with per-component
//!   overrides
//! - **Structured fields** merged from logger defaults and per-call context
//! - **Sinks**: console (text or JSON, optional colors) and rotating files
//!   with optional gzip compression
//! - **Failure isolation**: a failing or panicking sink never affects the
//!   caller or the other sinks
//!
//! ## Example
//!
//! ```
//! use vlog::prelude::*;
//!
//! let logger = Logger::builder()
//!     .level(LogLevel::Info)
//!     .sink(ConsoleSink::stdout())
//!     .build();
//!
//! let db = logger.with_component("db").with_field("pool", "primary");
//! db.info("connected");
//! db.sampled_warning("slow-query", 100, "query exceeded 1s");
//!
//! logger.close().unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        FieldValue, LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerConfig,
        LoggerError, OutputFormat, Result, Sink, TimestampFormat,
    };
    pub use crate::sinks::{ConsoleSink, RotatingFileSink, RotationPolicy};
}

pub use crate::core::{
    global, set_global, shutdown_global, stderr_handler, ConsoleSinkConfig, ConsoleStream,
    ErrorHandler, FieldValue, FileSinkConfig, LevelTable, LogContext, LogEntry, LogLevel, Logger,
    LoggerBuilder, LoggerConfig, LoggerError, LoggerMetrics, OutputFormat, OverflowCallback,
    RateSampler, Result, SamplerMetrics, Sink, TimestampFormat, DEFAULT_QUEUE_CAPACITY,
};
pub use sinks::{ConsoleSink, RotateCallback, RotatingFileSink, RotationPolicy};
