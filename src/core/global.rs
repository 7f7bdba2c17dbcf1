//! Process-wide default logger

use super::error::Result;
use super::logger::Logger;
use crate::sinks::ConsoleSink;
use std::sync::OnceLock;

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// The process-wide logger, created on first use as an `Info` logger
/// writing text to stdout unless [`set_global`] installed one earlier.
///
/// # Example
///
/// ```
/// vlog::global().info("service starting");
/// vlog::shutdown_global().unwrap();
/// ```
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(|| Logger::builder().sink(ConsoleSink::stdout()).build())
}

/// Install `logger` as the process-wide logger.
///
/// Succeeds only once and only before [`global`] was first called; on
/// failure the logger is handed back.
pub fn set_global(logger: Logger) -> std::result::Result<(), Logger> {
    GLOBAL.set(logger)
}

/// Drain and close the process-wide logger, if it was ever created.
///
/// Statics are never dropped, so call this before exit to avoid losing
/// queued entries.
pub fn shutdown_global() -> Result<()> {
    match GLOBAL.get() {
        Some(logger) => logger.close(),
        None => Ok(()),
    }
}
