//! Console sink implementation

use crate::core::output_format::format_text;
use crate::core::{LogEntry, LoggerError, OutputFormat, Result, Sink, TimestampFormat};
use colored::Colorize;
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes formatted entries to stdout, stderr or any `Write + Send`
///
/// # Example
///
/// ```
/// use vlog::{ConsoleSink, OutputFormat};
///
/// let sink = ConsoleSink::stderr()
///     .with_format(OutputFormat::Json)
///     .with_colors(false);
/// ```
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    name: String,
    use_colors: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleSink {
    fn with_boxed(writer: Box<dyn Write + Send>, name: &str) -> Self {
        Self {
            writer: Mutex::new(writer),
            name: name.to_string(),
            use_colors: false,
            timestamp_format: TimestampFormat::default(),
            output_format: OutputFormat::default(),
        }
    }

    pub fn stdout() -> Self {
        Self::with_boxed(Box::new(io::stdout()), "console:stdout")
    }

    pub fn stderr() -> Self {
        Self::with_boxed(Box::new(io::stderr()), "console:stderr")
    }

    /// Write to an arbitrary stream, e.g. a buffer in tests
    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::with_boxed(Box::new(writer), "console")
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Color the level name in text output
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set the timestamp format for text output
    ///
    /// # Examples
    ///
    /// ```
    /// use vlog::{ConsoleSink, TimestampFormat};
    ///
    /// let sink = ConsoleSink::stdout()
    ///     .with_timestamp_format(TimestampFormat::Iso8601Micros);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn render(&self, entry: &LogEntry) -> Result<String> {
        match self.output_format {
            OutputFormat::Text if self.use_colors => {
                let level = entry.level.to_str().color(entry.level.color_code()).to_string();
                format_text(entry, &self.timestamp_format, &level)
            }
            format => format.format(entry, &self.timestamp_format),
        }
    }

    fn stream_error(&self, e: io::Error) -> LoggerError {
        LoggerError::sink_write(self.name.as_str(), e.to_string())
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Sink for ConsoleSink {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let line = self.render(entry)?;
        self.writer
            .lock()
            .write_all(line.as_bytes())
            .map_err(|e| self.stream_error(e))
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush().map_err(|e| self.stream_error(e))
    }

    fn close(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
