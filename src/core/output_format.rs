//! Output format configuration for log entries
//!
//! Provides the two line formats shared by every sink:
//! - Text: human-readable, fields appended as a JSON object
//! - Json: one self-describing JSON record per line
//!
//! Both forms are newline terminated and carry no header, so output can be
//! appended to and concatenated across rotated files freely.

use super::error::Result;
use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `2025-01-08 10:30:45.123 [INFO] (http) [server.rs:42] Request processed {"status":200}`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"timestamp":"2025-01-08T10:30:45.123Z","level":"INFO","message":"Request processed"}`
    Json,
}

impl OutputFormat {
    /// Format a log entry as one newline-terminated line
    pub fn format(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> Result<String> {
        match self {
            OutputFormat::Text => format_text(entry, timestamp_format, entry.level.to_str()),
            OutputFormat::Json => format_json(entry),
        }
    }
}

/// Text layout with a caller-supplied rendering of the level name.
///
/// The console sink uses this to inject ANSI colors around the level.
pub(crate) fn format_text(
    entry: &LogEntry,
    timestamp_format: &TimestampFormat,
    level: &str,
) -> Result<String> {
    let mut line = String::with_capacity(64 + entry.message.len());
    line.push_str(&timestamp_format.format(&entry.timestamp));
    line.push_str(" [");
    line.push_str(level);
    line.push(']');

    if !entry.component.is_empty() {
        line.push_str(" (");
        line.push_str(&entry.component);
        line.push(')');
    }

    if let (Some(file), Some(lineno)) = (&entry.file, entry.line) {
        // writing into a String cannot fail
        let _ = write!(line, " [{}:{}]", file, lineno);
    }

    line.push(' ');
    line.push_str(&entry.message);

    if !entry.fields.is_empty() {
        line.push(' ');
        line.push_str(&entry.fields.to_json()?);
    }

    line.push('\n');
    Ok(line)
}

fn format_json(entry: &LogEntry) -> Result<String> {
    let mut line = serde_json::to_string(entry)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogContext, LogLevel};
    use chrono::TimeZone;

    fn fixed_entry() -> LogEntry {
        let mut entry = LogEntry::new(LogLevel::Info, "Request processed");
        entry.timestamp = chrono::Utc
            .with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime");
        entry
    }

    #[test]
    fn test_text_format_minimal() {
        let result = OutputFormat::Text
            .format(&fixed_entry(), &TimestampFormat::Simple)
            .unwrap();
        assert_eq!(result, "2025-01-08 10:30:45.000 [INFO] Request processed\n");
    }

    #[test]
    fn test_text_format_full() {
        let entry = fixed_entry()
            .with_component("http")
            .with_location("src/server.rs", 42)
            .with_fields(LogContext::new().with_field("status", 200).with_field("path", "/"));

        let result = OutputFormat::Text
            .format(&entry, &TimestampFormat::Simple)
            .unwrap();
        assert_eq!(
            result,
            "2025-01-08 10:30:45.000 [INFO] (http) [server.rs:42] Request processed {\"path\":\"/\",\"status\":200}\n"
        );
    }

    #[test]
    fn test_json_format() {
        let entry = fixed_entry().with_fields(LogContext::new().with_field("latency_ms", 42));
        let result = OutputFormat::Json
            .format(&entry, &TimestampFormat::Simple)
            .unwrap();

        assert!(result.ends_with('\n'));
        assert_eq!(result.matches('\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(result.trim_end()).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["message"], "Request processed");
        assert_eq!(parsed["fields"]["latency_ms"], 42);
        assert!(parsed["timestamp"].is_string());
        assert!(parsed.get("component").is_none());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        let format: OutputFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, OutputFormat::Json);
    }
}
