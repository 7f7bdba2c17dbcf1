//! Log level definitions
//!
//! Levels form a total order of ten ranks. Rank 0 is the most severe and
//! rank 9 the most verbose; a message passes a threshold when its rank is
//! less than or equal to the threshold's rank.

use super::error::LoggerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// System is unusable
    Emergency = 0,
    /// Action must be taken immediately
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    /// Normal but significant condition
    Notice = 5,
    #[default]
    Info = 6,
    Debug = 7,
    Verbose = 8,
    Trace = 9,
}

impl LogLevel {
    /// All levels, most severe first
    pub const ALL: [LogLevel; 10] = [
        LogLevel::Emergency,
        LogLevel::Alert,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Verbose,
        LogLevel::Trace,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Emergency => "EMERG",
            LogLevel::Alert => "ALERT",
            LogLevel::Critical => "CRIT",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERB",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Numeric rank, 0 (most severe) through 9 (most verbose)
    #[inline]
    pub const fn rank(self) -> i32 {
        self as i32
    }

    /// Level for a rank, if the rank is in range
    pub fn from_rank(rank: i32) -> Option<Self> {
        usize::try_from(rank)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical => BrightRed,
            LogLevel::Error => Red,
            LogLevel::Warning => Yellow,
            LogLevel::Notice => BrightBlue,
            LogLevel::Info => Green,
            LogLevel::Debug => Cyan,
            LogLevel::Verbose | LogLevel::Trace => Magenta,
        }
    }
}

impl From<LogLevel> for i32 {
    fn from(level: LogLevel) -> Self {
        level.rank()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EMERG" | "EMERGENCY" => Ok(LogLevel::Emergency),
            "ALERT" => Ok(LogLevel::Alert),
            "CRIT" | "CRITICAL" => Ok(LogLevel::Critical),
            "ERROR" | "ERR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warning),
            "NOTICE" => Ok(LogLevel::Notice),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "VERB" | "VERBOSE" => Ok(LogLevel::Verbose),
            "TRACE" => Ok(LogLevel::Trace),
            _ => Err(LoggerError::InvalidLevel(s.to_string())),
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_str())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
