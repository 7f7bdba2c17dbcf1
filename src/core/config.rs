//! Declarative logger configuration
//!
//! A [`LoggerConfig`] describes a root logger and its sinks in a form that
//! can be loaded from JSON, e.g. from a service's configuration file.
//!
//! ```
//! use vlog::LoggerConfig;
//!
//! let config = LoggerConfig::from_json(r#"{
//!     "level": "debug",
//!     "component_levels": { "net": "trace" },
//!     "fields": { "service": "api" },
//!     "console": { "stream": "stderr", "format": "json" }
//! }"#).unwrap();
//!
//! let logger = config.build().unwrap();
//! logger.with_component("net").trace("handshake");
//! logger.close().unwrap();
//! ```

use super::error::{LoggerError, Result};
use super::log_context::LogContext;
use super::log_level::LogLevel;
use super::logger::{Logger, LoggerBuilder};
use super::output_format::OutputFormat;
use super::pipeline::DEFAULT_QUEUE_CAPACITY;
use crate::sinks::{ConsoleSink, RotatingFileSink, RotationPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    /// Global threshold
    #[serde(default)]
    pub level: LogLevel,

    /// Per-component thresholds, replacing the global one for that component
    #[serde(default)]
    pub component_levels: BTreeMap<String, LogLevel>,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Default fields of the root logger
    #[serde(default)]
    pub fields: LogContext,

    /// Console output; omitted means no console sink
    #[serde(default)]
    pub console: Option<ConsoleSinkConfig>,

    #[serde(default)]
    pub files: Vec<FileSinkConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleSinkConfig {
    #[serde(default)]
    pub stream: ConsoleStream,

    #[serde(default)]
    pub format: OutputFormat,

    /// ANSI-colored level names (text format only)
    #[serde(default)]
    pub colors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSinkConfig {
    pub path: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,

    /// Rotation threshold in bytes; 0 disables rotation
    #[serde(default = "default_max_size")]
    pub max_size: u64,

    /// Gzip rotated files
    #[serde(default)]
    pub compress: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            component_levels: BTreeMap::new(),
            queue_capacity: default_queue_capacity(),
            fields: LogContext::new(),
            console: None,
            files: Vec::new(),
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_max_size() -> u64 {
    RotationPolicy::default().max_size
}

impl LoggerConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "queue_capacity",
                "must be at least 1",
            ));
        }
        if let Some(index) = self
            .files
            .iter()
            .position(|file| file.path.as_os_str().is_empty())
        {
            return Err(LoggerError::config(
                format!("files[{}].path", index),
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Open every sink and return a builder, so callers can still attach
    /// handlers or extra sinks before starting the logger.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting or file that cannot be opened.
    pub fn to_builder(&self) -> Result<LoggerBuilder> {
        self.validate()?;

        let mut builder = Logger::builder()
            .level(self.level)
            .queue_capacity(self.queue_capacity);

        for (component, level) in &self.component_levels {
            builder = builder.component_level(component.as_str(), *level);
        }
        for (key, value) in self.fields.fields() {
            builder = builder.field(key.as_str(), value.clone());
        }

        if let Some(console) = &self.console {
            let sink = match console.stream {
                ConsoleStream::Stdout => ConsoleSink::stdout(),
                ConsoleStream::Stderr => ConsoleSink::stderr(),
            };
            builder = builder.sink(sink.with_format(console.format).with_colors(console.colors));
        }

        for file in &self.files {
            let policy = RotationPolicy::new()
                .with_max_size(file.max_size)
                .with_compression(file.compress);
            let sink = RotatingFileSink::with_policy(&file.path, policy)?.with_format(file.format);
            builder = builder.sink(sink);
        }

        Ok(builder)
    }

    /// Build the root logger described by this configuration.
    pub fn build(&self) -> Result<Logger> {
        Ok(self.to_builder()?.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::from_json("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.console.is_none());
    }

    #[test]
    fn test_full_document() {
        let config = LoggerConfig::from_json(
            r#"{
                "level": "WARNING",
                "component_levels": { "net": "trace", "db": "crit" },
                "queue_capacity": 64,
                "fields": { "service": "api", "version": 3 },
                "console": { "stream": "stderr", "colors": true },
                "files": [ { "path": "/tmp/app.log", "format": "json", "compress": true } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.level, LogLevel::Warning);
        assert_eq!(config.component_levels["net"], LogLevel::Trace);
        assert_eq!(config.component_levels["db"], LogLevel::Critical);
        assert_eq!(config.fields.len(), 2);

        let console = config.console.as_ref().unwrap();
        assert_eq!(console.stream, ConsoleStream::Stderr);
        assert_eq!(console.format, OutputFormat::Text);
        assert!(console.colors);

        let file = &config.files[0];
        assert_eq!(file.format, OutputFormat::Json);
        assert_eq!(file.max_size, RotationPolicy::default().max_size);
        assert!(file.compress);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            LoggerConfig::from_json(r#"{"level": "loud"}"#),
            Err(LoggerError::JsonError(_))
        ));
        assert!(matches!(
            LoggerConfig::from_json(r#"{"levels": "info"}"#),
            Err(LoggerError::JsonError(_))
        ));
        assert!(matches!(
            LoggerConfig::from_json(r#"{"queue_capacity": 0}"#),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            LoggerConfig::from_json(r#"{"files": [{"path": ""}]}"#),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_build_applies_levels_and_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/app.log");

        let config = LoggerConfig {
            level: LogLevel::Error,
            component_levels: BTreeMap::from([("net".to_string(), LogLevel::Debug)]),
            files: vec![FileSinkConfig {
                path: path.clone(),
                format: OutputFormat::Text,
                max_size: 0,
                compress: false,
            }],
            ..LoggerConfig::default()
        };

        let logger = config.build().unwrap();
        assert_eq!(logger.sink_count(), 1);
        logger.info("filtered");
        logger.with_component("net").debug("kept");
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("(net)"));
        assert!(contents.contains("kept"));
        assert!(!contents.contains("filtered"));
    }

    #[test]
    fn test_unopenable_file_fails_synchronously() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as a log file
        let config = LoggerConfig {
            files: vec![FileSinkConfig {
                path: dir.path().to_path_buf(),
                format: OutputFormat::Text,
                max_size: 0,
                compress: false,
            }],
            ..LoggerConfig::default()
        };

        assert!(matches!(
            config.build(),
            Err(LoggerError::FileSinkError { .. })
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = LoggerConfig {
            console: Some(ConsoleSinkConfig::default()),
            ..LoggerConfig::default()
        };
        let parsed = LoggerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
