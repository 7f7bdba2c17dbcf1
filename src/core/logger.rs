//! Main logger implementation

use super::{
    error::{stderr_handler, ErrorHandler, Result},
    level_table::LevelTable,
    log_context::{FieldValue, LogContext},
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    pipeline::{OverflowCallback, Pipeline, DEFAULT_QUEUE_CAPACITY},
    sampling::SamplerMetrics,
    sink::Sink,
};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Generates the per-level convenience methods.
///
/// Each level gets a plain method, a `*_with` variant taking per-call
/// fields, and a `sampled_*` variant. All of them are `#[track_caller]` so
/// the recorded location is the user's call site.
macro_rules! level_methods {
    ($($level:ident => $plain:ident, $with:ident, $sampled:ident;)*) => {
        $(
            #[doc = concat!("Log a message at `", stringify!($level), "` level.")]
            #[inline]
            #[track_caller]
            pub fn $plain(&self, message: impl Into<String>) {
                self.emit(LogLevel::$level, message, None, None, None, Location::caller());
            }

            #[doc = concat!("Log a message with per-call fields at `", stringify!($level), "` level.")]
            #[inline]
            #[track_caller]
            pub fn $with(&self, message: impl Into<String>, fields: LogContext) {
                self.emit(LogLevel::$level, message, Some(fields), None, None, Location::caller());
            }

            #[doc = concat!("Emit one in every `rate` calls sharing `key` at `", stringify!($level), "` level.")]
            #[inline]
            #[track_caller]
            pub fn $sampled(&self, key: &str, rate: i64, message: impl Into<String>) {
                self.emit(LogLevel::$level, message, None, Some((key, rate)), None, Location::caller());
            }
        )*
    };
}

/// A handle onto a logging pipeline
///
/// The root logger, created by [`Logger::builder`] or [`Logger::new`],
/// owns the pipeline: the queue, the dispatcher thread, the sinks, the
/// level table and the sampler. Loggers derived with
/// [`with_component`](Self::with_component),
/// [`with_field`](Self::with_field) or [`with_fields`](Self::with_fields)
/// share that pipeline and only carry their own component and default
/// fields.
///
/// # Example
///
/// ```
/// use vlog::prelude::*;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .sink(ConsoleSink::stderr())
///     .build();
///
/// let http = logger.with_component("http").with_field("service", "api");
/// http.info("listening");
/// http.debug_with("request", LogContext::new().with_field("status", 200));
///
/// logger.close().unwrap();
/// ```
pub struct Logger {
    pipeline: Arc<Pipeline>,
    component: String,
    fields: LogContext,
    root: bool,
}

impl Logger {
    /// A root logger at `Info` with no sinks and the default queue capacity
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use vlog::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .level(LogLevel::Debug)
    ///     .queue_capacity(1000)
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn derive(&self, component: String, fields: LogContext) -> Logger {
        Logger {
            pipeline: Arc::clone(&self.pipeline),
            component,
            fields,
            root: false,
        }
    }

    /// Derive a logger tagged with `component`, keeping this logger's fields.
    #[must_use]
    pub fn with_component(&self, component: impl Into<String>) -> Logger {
        self.derive(component.into(), self.fields.clone())
    }

    /// Derive a logger with one more default field.
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Logger {
        self.derive(
            self.component.clone(),
            self.fields.clone().with_field(key, value),
        )
    }

    /// Derive a logger whose defaults are this logger's overlaid with `fields`.
    #[must_use]
    pub fn with_fields(&self, fields: LogContext) -> Logger {
        let mut merged = self.fields.clone();
        merged.merge(&fields);
        self.derive(self.component.clone(), merged)
    }

    /// Add or replace a default field on this logger only.
    pub fn set_default_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.add_field(key, value);
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Default fields attached to every entry from this logger
    pub fn default_fields(&self) -> &LogContext {
        &self.fields
    }

    /// Whether this logger created the pipeline (as opposed to being derived)
    pub fn is_root(&self) -> bool {
        self.root
    }

    level_methods! {
        Emergency => emergency, emergency_with, sampled_emergency;
        Alert => alert, alert_with, sampled_alert;
        Critical => critical, critical_with, sampled_critical;
        Error => error, error_with, sampled_error;
        Warning => warning, warning_with, sampled_warning;
        Notice => notice, notice_with, sampled_notice;
        Info => info, info_with, sampled_info;
        Debug => debug, debug_with, sampled_debug;
        Verbose => verbose, verbose_with, sampled_verbose;
        Trace => trace, trace_with, sampled_trace;
    }

    #[inline]
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.emit(level, message, None, None, None, Location::caller());
    }

    /// Log on behalf of the function `func`, as the logging macros do.
    ///
    /// `func` is recorded as the `func` field when this logger's component
    /// is loggable at `Trace`; a `func` field set by the caller wins.
    #[inline]
    #[track_caller]
    pub fn log_at(&self, level: LogLevel, message: impl Into<String>, func: &str) {
        self.emit(level, message, None, None, Some(func), Location::caller());
    }

    /// Log with structured fields merged over this logger's defaults
    #[inline]
    #[track_caller]
    pub fn log_with_fields(&self, level: LogLevel, message: impl Into<String>, fields: LogContext) {
        self.emit(level, message, Some(fields), None, None, Location::caller());
    }

    /// Emit only the last call of every window of `rate` calls sharing `key`.
    ///
    /// The first call with a new rate for `key` (or a changed rate) starts a
    /// fresh window; calls that fail the level check never advance it.
    ///
    /// # Example
    ///
    /// ```
    /// use vlog::prelude::*;
    ///
    /// let logger = Logger::new();
    /// for attempt in 0..10 {
    ///     logger.sampled(LogLevel::Warning, "retry", 5, format!("retry {}", attempt), LogContext::new());
    /// }
    /// assert_eq!(logger.sampler_metrics().sampled_count(), 2);
    /// ```
    #[inline]
    #[track_caller]
    pub fn sampled(
        &self,
        level: LogLevel,
        key: &str,
        rate: i64,
        message: impl Into<String>,
        fields: LogContext,
    ) {
        self.emit(level, message, Some(fields), Some((key, rate)), None, Location::caller());
    }

    fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        fields: Option<LogContext>,
        sampling: Option<(&str, i64)>,
        func: Option<&str>,
        location: &'static Location<'static>,
    ) {
        let levels = self.pipeline.levels();
        if !levels.is_loggable(level, &self.component) {
            return;
        }

        // an empty key means the call is not sampled
        if let Some((key, rate)) = sampling.filter(|(key, _)| !key.is_empty()) {
            let sampler = self.pipeline.sampler();
            sampler.ensure_rate(key, rate);
            if !sampler.should_log(key) {
                return;
            }
        }

        let mut merged = self.fields.clone();
        if let Some(extra) = fields {
            merged.merge(&extra);
        }
        if let Some(func) = func {
            if merged.get("func").is_none()
                && levels.is_loggable(LogLevel::Trace, &self.component)
            {
                merged.add_field("func", func);
            }
        }

        let entry = LogEntry::new(level, message)
            .with_component(self.component.as_str())
            .with_caller(location)
            .with_fields(merged)
            .with_instance_id(self.pipeline.instance_id());

        self.pipeline.enqueue(entry);
    }

    /// Set the global threshold; any integer is accepted.
    pub fn set_level(&self, level: impl Into<i32>) {
        self.pipeline.levels().set_level(level);
    }

    pub fn level(&self) -> i32 {
        self.pipeline.levels().level()
    }

    /// Override the threshold for one component, replacing the global one.
    pub fn set_component_level(&self, component: impl Into<String>, level: impl Into<i32>) {
        self.pipeline.levels().set_component_level(component, level);
    }

    pub fn component_level(&self, component: &str) -> Option<i32> {
        self.pipeline.levels().component_level(component)
    }

    pub fn clear_component_level(&self, component: &str) -> Option<i32> {
        self.pipeline.levels().clear_component_level(component)
    }

    /// Whether `level` would pass the level check for this logger's component
    pub fn is_loggable(&self, level: LogLevel) -> bool {
        self.pipeline.levels().is_loggable(level, &self.component)
    }

    /// Register a sampling rate for `key`, restarting its window.
    pub fn set_sampling_rate(&self, key: &str, rate: i64) {
        self.pipeline.sampler().set_rate(key, rate);
    }

    pub fn sampler_metrics(&self) -> &SamplerMetrics {
        self.pipeline.sampler().metrics()
    }

    /// Attach a sink to the shared pipeline
    pub fn add_sink<S: Sink + 'static>(&self, sink: S) {
        self.pipeline.add_sink(Arc::new(sink));
    }

    /// Attach a sink the caller keeps a handle to
    pub fn add_shared_sink(&self, sink: Arc<dyn Sink>) {
        self.pipeline.add_sink(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.pipeline.sink_count()
    }

    /// Identifier of the pipeline, `<pid>-<unix nanos>`
    pub fn instance_id(&self) -> &str {
        self.pipeline.instance_id()
    }

    /// Get the logger metrics for detailed observability
    ///
    /// # Example
    ///
    /// ```
    /// use vlog::Logger;
    ///
    /// let logger = Logger::new();
    /// logger.info("hello");
    /// logger.flush();
    ///
    /// let metrics = logger.metrics();
    /// println!("Dropped: {}", metrics.dropped_count());
    /// println!("Delivered: {}", metrics.delivered_count());
    /// println!("Drop rate: {:.2}%", metrics.drop_rate());
    /// ```
    pub fn metrics(&self) -> &LoggerMetrics {
        self.pipeline.metrics()
    }

    /// Entries dropped on overflow or after close
    pub fn dropped_count(&self) -> u64 {
        self.pipeline.metrics().dropped_count()
    }

    pub fn queue_capacity(&self) -> usize {
        self.pipeline.capacity()
    }

    /// Entries waiting in the queue right now
    pub fn queue_len(&self) -> usize {
        self.pipeline.queue_len()
    }

    pub fn is_closed(&self) -> bool {
        self.pipeline.is_closed()
    }

    /// Wait until every entry accepted so far has been written and flushed.
    pub fn flush(&self) {
        self.pipeline.flush();
    }

    /// Drain the queue, stop the dispatcher and close every sink.
    ///
    /// Only the root logger closes the pipeline; on a derived logger this is
    /// a no-op. Calling it twice is harmless. Every sink close error is
    /// reported to the error handler and the first one is returned.
    pub fn close(&self) -> Result<()> {
        if !self.root {
            return Ok(());
        }
        self.pipeline.close()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("fields", &self.fields)
            .field("root", &self.root)
            .field("instance_id", &self.pipeline.instance_id())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use vlog::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .component_level("net", LogLevel::Trace)
///     .sink(ConsoleSink::stdout())
///     .queue_capacity(1000)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build();
/// ```
pub struct LoggerBuilder {
    level: i32,
    component_levels: Vec<(String, i32)>,
    queue_capacity: usize,
    component: String,
    fields: LogContext,
    sinks: Vec<Arc<dyn Sink>>,
    on_overflow: Option<OverflowCallback>,
    on_error: Option<ErrorHandler>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            level: LogLevel::Info.rank(),
            component_levels: Vec::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            component: String::new(),
            fields: LogContext::new(),
            sinks: Vec::new(),
            on_overflow: None,
            on_error: None,
        }
    }

    /// Set the global threshold
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: impl Into<i32>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn component_level(mut self, component: impl Into<String>, level: impl Into<i32>) -> Self {
        self.component_levels.push((component.into(), level.into()));
        self
    }

    /// Capacity of the entry queue; zero is raised to one
    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Component of the root logger itself
    #[must_use = "builder methods return a new value"]
    pub fn component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Default field of the root logger
    #[must_use = "builder methods return a new value"]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.add_field(key, value);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Set a callback for overflow notifications
    ///
    /// The callback is invoked on the first dropped entry and every 1000th
    /// thereafter, with the total count of dropped entries.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Replace the default stderr error handler
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Build the root Logger and start its dispatcher
    pub fn build(self) -> Logger {
        let levels = LevelTable::new(self.level);
        for (component, level) in self.component_levels {
            levels.set_component_level(component, level);
        }

        let pipeline = Pipeline::new(
            self.queue_capacity,
            levels,
            self.on_error.unwrap_or_else(stderr_handler),
            self.on_overflow,
        );
        for sink in self.sinks {
            pipeline.add_sink(sink);
        }

        Logger {
            pipeline: Arc::new(pipeline),
            component: self.component,
            fields: self.fields,
            root: true,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl CaptureSink {
        fn messages(&self) -> Vec<String> {
            self.entries.lock().iter().map(|e| e.message.clone()).collect()
        }
    }

    impl Sink for CaptureSink {
        fn write(&self, entry: &LogEntry) -> Result<()> {
            self.entries.lock().push(entry.clone());
            Ok(())
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn capture_logger(level: LogLevel) -> (Logger, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::default());
        let logger = Logger::builder()
            .level(level)
            .shared_sink(sink.clone())
            .build();
        (logger, sink)
    }

    #[test]
    fn test_builder_defaults() {
        let logger = Logger::builder().build();
        assert_eq!(logger.level(), LogLevel::Info.rank());
        assert_eq!(logger.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(logger.sink_count(), 0);
        assert!(logger.is_root());
        assert_eq!(logger.dropped_count(), 0);
    }

    #[test]
    fn test_level_filtering() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        logger.debug("hidden");
        logger.info("shown");
        logger.error("also shown");
        logger.flush();

        assert_eq!(sink.messages(), ["shown", "also shown"]);
        assert!(!logger.is_loggable(LogLevel::Debug));
        assert!(logger.is_loggable(LogLevel::Emergency));
    }

    #[test]
    fn test_entry_carries_caller_location_and_instance() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        logger.with_component("db").warning("slow query");
        logger.flush();

        let entries = sink.entries.lock();
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.component, "db");
        assert_eq!(entry.file.as_deref(), Some("logger.rs"));
        assert!(entry.line.is_some());
        assert_eq!(entry.instance_id, logger.instance_id());
    }

    #[test]
    fn test_component_override_seen_by_derived_logger() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        let net = logger.with_component("net");

        net.trace("before");
        logger.set_component_level("net", LogLevel::Trace);
        net.trace("after");
        logger.with_component("db").trace("other component");
        logger.flush();

        assert_eq!(sink.messages(), ["after"]);
        assert_eq!(logger.component_level("net"), Some(LogLevel::Trace.rank()));
    }

    #[test]
    fn test_field_merge_precedence() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        let prod = logger.with_field("env", "prod").with_field("region", "eu");

        prod.info_with("deploy", LogContext::new().with_field("env", "staging"));
        logger.flush();

        let entries = sink.entries.lock();
        let fields = &entries[0].fields;
        assert_eq!(fields.get("env").and_then(FieldValue::as_str), Some("staging"));
        assert_eq!(fields.get("region").and_then(FieldValue::as_str), Some("eu"));
    }

    #[test]
    fn test_set_default_field_is_local() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        let mut worker = logger.with_component("worker");
        worker.set_default_field("id", 7);

        worker.info("from worker");
        logger.info("from root");
        logger.flush();

        let entries = sink.entries.lock();
        assert_eq!(entries[0].fields.len(), 1);
        assert!(entries[1].fields.is_empty());
    }

    #[test]
    fn test_sampled_emits_last_of_each_window() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        for i in 1..=7 {
            logger.sampled_info("poll", 3, format!("poll {}", i));
        }
        logger.flush();

        assert_eq!(sink.messages(), ["poll 3", "poll 6"]);
        assert_eq!(logger.sampler_metrics().sampled_count(), 2);
        assert_eq!(logger.sampler_metrics().suppressed_count(), 5);
    }

    #[test]
    fn test_filtered_sampled_call_does_not_advance_window() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        for _ in 0..5 {
            logger.sampled_debug("k", 2, "filtered");
        }
        logger.sampled_info("k", 2, "first");
        logger.sampled_info("k", 2, "second");
        logger.flush();

        assert_eq!(sink.messages(), ["second"]);
    }

    #[test]
    fn test_empty_sampling_key_is_not_sampled() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        for i in 1..=3 {
            logger.sampled_info("", 3, format!("call {}", i));
        }
        logger.flush();

        assert_eq!(sink.messages(), ["call 1", "call 2", "call 3"]);
        assert_eq!(logger.sampler_metrics().total_count(), 0);
    }

    #[test]
    fn test_func_field_follows_trace_loggability() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        let net = logger.with_component("net");
        logger.set_component_level("net", LogLevel::Trace);

        logger.log_at(LogLevel::Info, "root", "server::run");
        net.log_at(LogLevel::Info, "net", "server::accept");
        net.with_field("func", "custom")
            .log_at(LogLevel::Info, "overridden", "server::accept");
        logger.flush();

        let entries = sink.entries.lock();
        assert!(entries[0].fields.get("func").is_none());
        assert_eq!(
            entries[1].fields.get("func").and_then(FieldValue::as_str),
            Some("server::accept")
        );
        assert_eq!(
            entries[2].fields.get("func").and_then(FieldValue::as_str),
            Some("custom")
        );
    }

    #[test]
    fn test_close_on_derived_logger_is_noop() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        let child = logger.with_component("child");

        child.close().unwrap();
        assert!(!logger.is_closed());

        child.info("still open");
        logger.close().unwrap();
        assert!(logger.is_closed());
        assert_eq!(sink.messages(), ["still open"]);

        child.info("after close");
        assert_eq!(logger.dropped_count(), 1);
    }

    #[test]
    fn test_numeric_levels() {
        let (logger, sink) = capture_logger(LogLevel::Info);
        logger.set_level(-1);
        logger.emergency("nothing passes");
        logger.set_level(100);
        logger.trace("everything passes");
        logger.flush();

        assert_eq!(sink.messages(), ["everything passes"]);
    }
}
