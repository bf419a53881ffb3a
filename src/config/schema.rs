//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the gateway. Unlike a
//! derive-only schema, documents are merged field-by-field onto the defaults
//! (see `loader.rs`), so every type here has an explicit default.

use serde::Serialize;

/// Default service port.
pub const DEFAULT_PORT: &str = "8554";

/// Default log target.
pub const DEFAULT_LOG_PATH: &str = "stdout";

/// Severity of a log line, most severe first.
///
/// The numeric order matters: a configured level admits every severity whose
/// value is lower than or equal to its own.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// All levels, most severe first.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Map a configuration string onto a level. Matching is case-sensitive.
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Upper-case tag written in front of every log line.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Returns true if a line of `severity` passes a threshold of `self`.
    pub fn admits(self, severity: LogLevel) -> bool {
        severity <= self
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// The log level as written in the document.
///
/// An unrecognized string is kept as an explicit invalid marker instead of
/// falling back to the default, so validation can reject it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LevelSetting {
    Level(LogLevel),
    Unrecognized(String),
}

impl LevelSetting {
    /// The level, if the setting holds one of the five defined levels.
    pub fn level(&self) -> Option<LogLevel> {
        match self {
            LevelSetting::Level(level) => Some(*level),
            LevelSetting::Unrecognized(_) => None,
        }
    }
}

impl Default for LevelSetting {
    fn default() -> Self {
        LevelSetting::Level(LogLevel::Info)
    }
}

impl From<LogLevel> for LevelSetting {
    fn from(level: LogLevel) -> Self {
        LevelSetting::Level(level)
    }
}

/// A named media source mapped onto one endpoint.
///
/// Both fields default to empty when absent from the document. Parsing accepts
/// such entries; mounting rejects them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Identifies the physical/source device.
    pub name: String,
    /// Path segment the device is reachable under.
    pub endpoint: String,
}

impl Device {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Returns true if both fields are non-empty.
    pub fn is_mountable(&self) -> bool {
        !self.name.is_empty() && !self.endpoint.is_empty()
    }

    /// Endpoint path as exposed by the engine (`/` + endpoint).
    pub fn endpoint_path(&self) -> String {
        format!("/{}", self.endpoint)
    }
}

/// Root configuration for the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Service port, kept as text until validation.
    pub port: String,

    /// `"stdout"`, `"stderr"` or a file path opened in append mode.
    pub log_path: String,

    /// Threshold for the logger.
    pub log_level: LevelSetting,

    /// Devices in mount order.
    pub devices: Vec<Device>,

    /// Last parsed document. Replaced on every successful load.
    #[serde(skip)]
    pub(crate) document: Option<serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            log_path: DEFAULT_LOG_PATH.to_string(),
            log_level: LevelSetting::default(),
            devices: Vec::new(),
            document: None,
        }
    }
}
