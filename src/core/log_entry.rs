//! Log entry structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::Location;
use std::path::Path;

/// One accepted log record, immutable once it enters the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "LogContext::is_empty")]
    pub fields: LogContext,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id: String,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// so that every entry stays on exactly one output line.
    fn sanitize_message(message: &str) -> String {
        if !message.contains(['\n', '\r', '\t']) {
            return message.to_string();
        }
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            timestamp: Utc::now(),
            level,
            message: Self::sanitize_message(&message),
            component: String::new(),
            file: None,
            line: None,
            fields: LogContext::new(),
            instance_id: String::new(),
        }
    }

    /// Record the source location; only the file's base name is kept.
    #[must_use]
    pub fn with_location(mut self, file: &str, line: u32) -> Self {
        let base = Path::new(file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file);
        self.file = Some(base.to_string());
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_caller(self, location: &Location<'_>) -> Self {
        self.with_location(location.file(), location.line())
    }

    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: LogContext) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }
}
