//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. The level is
//! checked before the arguments are formatted, the recorded source location
//! is the macro call site, and the calling function is attached as the
//! `func` field when the logger is at `Trace`.
//!
//! # Examples
//!
//! ```
//! use vlog::prelude::*;
//! use vlog::{fields, info, warning};
//!
//! let logger = Logger::new();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With structured fields
//! logger.warning_with("slow request", fields! { "path" => "/health", "ms" => 812 });
//! warning!(logger, "{} retries left", 2);
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use vlog::prelude::*;
/// # let logger = Logger::new();
/// use vlog::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_loggable(level) {
            logger.log_at(level, format!($($arg)+), $crate::__function_name!());
        }
    }};
}

/// `module::function` of the enclosing function.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn __vlog_here() {}
        $crate::macros::enclosing_function(::std::any::type_name_of_val(&__vlog_here))
    }};
}

/// Trim the type name of a marker fn down to `module::function`.
#[doc(hidden)]
pub fn enclosing_function(marker: &'static str) -> &'static str {
    let mut path = marker.strip_suffix("::__vlog_here").unwrap_or(marker);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    match path.rmatch_indices("::").nth(1) {
        Some((i, _)) => &path[i + 2..],
        None => path,
    }
}

/// Build a [`LogContext`](crate::LogContext) from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use vlog::fields;
///
/// let ctx = fields! { "user" => "alice", "attempt" => 3 };
/// assert_eq!(ctx.len(), 2);
/// assert!(fields! {}.is_empty());
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::LogContext::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut ctx = $crate::LogContext::new();
        $( ctx.add_field($key, $value); )+
        ctx
    }};
}

/// Log an emergency-level message.
#[macro_export]
macro_rules! emergency {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Emergency, $($arg)+)
    };
}

/// Log an alert-level message.
#[macro_export]
macro_rules! alert {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Alert, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use vlog::prelude::*;
/// # let logger = Logger::new();
/// use vlog::error;
/// error!(logger, "Failed to connect to database");
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use vlog::prelude::*;
/// # let logger = Logger::new();
/// use vlog::warning;
/// warning!(logger, "Low disk space");
/// warning!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log a notice-level message.
#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Notice, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use vlog::prelude::*;
/// # let logger = Logger::new();
/// use vlog::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log a verbose-level message.
#[macro_export]
macro_rules! verbose {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Verbose, $($arg)+)
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use vlog::prelude::*;
/// # let logger = Logger::new();
/// # logger.set_level(LogLevel::Trace);
/// use vlog::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use super::enclosing_function;
    use crate::core::{FieldValue, LogEntry, LogLevel, Logger, Result, Sink};
    use parking_lot::Mutex;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Capture(Mutex<Vec<LogEntry>>);

    impl Sink for Capture {
        fn write(&self, entry: &LogEntry) -> Result<()> {
            self.0.lock().push(entry.clone());
            Ok(())
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    /// Counts how often it is rendered
    struct Costly<'a>(&'a AtomicUsize);

    impl fmt::Display for Costly<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.fetch_add(1, Ordering::SeqCst);
            write!(f, "costly")
        }
    }

    fn logger() -> (Logger, Arc<Capture>) {
        logger_at(LogLevel::Trace)
    }

    fn logger_at(level: LogLevel) -> (Logger, Arc<Capture>) {
        let sink = Arc::new(Capture::default());
        let logger = Logger::builder()
            .level(level)
            .shared_sink(sink.clone())
            .build();
        (logger, sink)
    }

    #[test]
    fn test_every_level_macro() {
        let (logger, sink) = logger();
        emergency!(logger, "m{}", 0);
        alert!(logger, "m{}", 1);
        critical!(logger, "m{}", 2);
        error!(logger, "m{}", 3);
        warning!(logger, "m{}", 4);
        notice!(logger, "m{}", 5);
        info!(logger, "m{}", 6);
        debug!(logger, "m{}", 7);
        verbose!(logger, "m{}", 8);
        trace!(logger, "m{}", 9);
        logger.flush();

        let entries = sink.0.lock();
        assert_eq!(entries.len(), 10);
        for (rank, entry) in entries.iter().enumerate() {
            assert_eq!(entry.level.rank(), rank as i32);
            assert_eq!(entry.message, format!("m{}", rank));
        }
    }

    #[test]
    fn test_macro_records_call_site() {
        let (logger, sink) = logger();
        log!(logger, LogLevel::Info, "Formatted: {}", 42);
        logger.flush();

        let entries = sink.0.lock();
        assert_eq!(entries[0].message, "Formatted: 42");
        assert_eq!(entries[0].file.as_deref(), Some("macros.rs"));
    }

    #[test]
    fn test_suppressed_macro_skips_formatting() {
        let (logger, sink) = logger_at(LogLevel::Info);
        let rendered = AtomicUsize::new(0);

        debug!(logger, "value {}", Costly(&rendered));
        trace!(logger, "value {}", Costly(&rendered));
        assert_eq!(rendered.load(Ordering::SeqCst), 0);

        info!(logger, "value {}", Costly(&rendered));
        logger.flush();
        assert_eq!(rendered.load(Ordering::SeqCst), 1);
        assert_eq!(sink.0.lock()[0].message, "value costly");
    }

    #[test]
    fn test_func_field_only_at_trace() {
        let (logger, sink) = logger();
        info!(logger, "traced");
        logger.set_level(LogLevel::Info);
        info!(logger, "plain");
        logger.flush();

        let entries = sink.0.lock();
        assert_eq!(
            entries[0].fields.get("func").and_then(FieldValue::as_str),
            Some("tests::test_func_field_only_at_trace")
        );
        assert!(entries[1].fields.get("func").is_none());
    }

    #[test]
    fn test_enclosing_function_trims_path() {
        assert_eq!(
            enclosing_function("app::server::handle::__vlog_here"),
            "server::handle"
        );
        assert_eq!(
            enclosing_function("app::server::handle::{{closure}}::{{closure}}::__vlog_here"),
            "server::handle"
        );
        assert_eq!(enclosing_function("main::__vlog_here"), "main");
    }

    #[test]
    fn test_fields_macro() {
        let ctx = fields! { "user" => "alice", "attempt" => 3, "user" => "bob" };
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get("user").and_then(|v| v.as_str()), Some("bob"));
    }
}
