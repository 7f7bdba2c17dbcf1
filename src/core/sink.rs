//! Sink trait for log output destinations

use super::{error::Result, log_entry::LogEntry};

/// A destination that persists or displays one entry at a time.
///
/// Sinks are shared between the dispatcher thread and their owner, so all
/// methods take `&self`; implementations serialize concurrent writers
/// internally. A sink may fail on any call without affecting other sinks.
///
/// # Example
///
/// ```
/// use vlog::{LogEntry, Result, Sink};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingSink(AtomicUsize);
///
/// impl Sink for CountingSink {
///     fn write(&self, _entry: &LogEntry) -> Result<()> {
///         self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(())
///     }
///
///     fn close(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "counting"
///     }
/// }
/// ```
pub trait Sink: Send + Sync {
    fn write(&self, entry: &LogEntry) -> Result<()>;

    /// Push buffered output to the underlying stream.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources; called exactly once by the owning logger.
    fn close(&self) -> Result<()>;

    fn name(&self) -> &str;
}
