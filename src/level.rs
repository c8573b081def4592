use serde::{Serialize, Serializer};
use std::fmt;

/// Severity level of an internal log record.
///
/// Numeric values follow the upstream record convention (`60` = fatal down
/// to `10` = trace), so a larger number means a more urgent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Numeric value used on the wire.
    pub fn as_u64(self) -> u64 {
        match self {
            LogLevel::Fatal => 60,
            LogLevel::Error => 50,
            LogLevel::Warn => 40,
            LogLevel::Info => 30,
            LogLevel::Debug => 20,
            LogLevel::Trace => 10,
        }
    }

    /// External severity code for this level.
    pub fn severity(self) -> Severity {
        match self {
            LogLevel::Fatal => Severity::Critical,
            LogLevel::Error => Severity::Error,
            LogLevel::Warn => Severity::Warning,
            LogLevel::Info => Severity::Info,
            LogLevel::Debug => Severity::Debug,
            LogLevel::Trace => Severity::Debug,
        }
    }

    /// Returns `true` if a record at `self` passes a `threshold` filter.
    pub fn is_at_least(self, threshold: LogLevel) -> bool {
        self.as_u64() >= threshold.as_u64()
    }
}

impl TryFrom<u64> for LogLevel {
    type Error = UnknownLevel;

    fn try_from(value: u64) -> Result<Self, UnknownLevel> {
        match value {
            60 => Ok(LogLevel::Fatal),
            50 => Ok(LogLevel::Error),
            40 => Ok(LogLevel::Warn),
            30 => Ok(LogLevel::Info),
            20 => Ok(LogLevel::Debug),
            10 => Ok(LogLevel::Trace),
            other => Err(UnknownLevel(other)),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => LogLevel::Error,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::DEBUG => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = UnknownLevelName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(UnknownLevelName(s.to_string())),
        }
    }
}

/// Error returned when a numeric level has no [`LogLevel`] counterpart.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown log level number {0}")]
pub struct UnknownLevel(pub u64);

/// Error returned when parsing a level name fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level name {0:?}")]
pub struct UnknownLevelName(pub String);

/// Severity codes understood by the logging platform.
///
/// Serialized as the bare integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Severity {
    pub fn code(self) -> u16 {
        match self {
            Severity::Default => 0,
            Severity::Debug => 100,
            Severity::Info => 200,
            Severity::Notice => 300,
            Severity::Warning => 400,
            Severity::Error => 500,
            Severity::Critical => 600,
            Severity::Alert => 700,
            Severity::Emergency => 800,
        }
    }
}

impl From<LogLevel> for Severity {
    fn from(level: LogLevel) -> Self {
        level.severity()
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}
