//! Error types for the logger system

use std::sync::Arc;

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Out-of-band receiver for errors that must never reach a log call site
///
/// Sink write failures, rotation failures, compression failures and queue
/// overflow are all routed here. The default handler prints to stderr.
pub type ErrorHandler = Arc<dyn Fn(&LoggerError) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Entry dropped because the pipeline queue was at capacity
    #[error("Log queue full (capacity {capacity}): {dropped} entries dropped so far")]
    QueueFull { capacity: usize, dropped: u64 },

    /// Logger or sink already closed
    #[error("Logger already closed")]
    LoggerClosed,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Unknown level name
    #[error("Invalid log level: '{0}'")]
    InvalidLevel(String),

    /// File sink could not open its target
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Post-rotation compression error
    #[error("Compression failed for '{path}': {message}")]
    CompressionError { path: String, message: String },

    /// A sink failed to persist an entry
    #[error("Sink '{sink}' failed: {message}")]
    SinkWriteError { sink: String, message: String },

    /// A sink panicked while handling an entry
    #[error("Sink '{sink}' panicked: {message}")]
    SinkPanic { sink: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    pub fn queue_full(capacity: usize, dropped: u64) -> Self {
        LoggerError::QueueFull { capacity, dropped }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn compression(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::CompressionError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWriteError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn sink_panic(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkPanic {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error only reports lost entries (overflow) rather than a broken sink
    #[must_use]
    pub fn is_overload(&self) -> bool {
        matches!(self, LoggerError::QueueFull { .. })
    }
}

/// Default error handler: one line per problem on stderr
pub fn stderr_handler() -> ErrorHandler {
    Arc::new(|err: &LoggerError| {
        if err.is_overload() {
            eprintln!(
                "[LOGGER WARNING] {}. Consider increasing the queue capacity.",
                err
            );
        } else {
            eprintln!("[LOGGER ERROR] {}", err);
        }
    })
}
