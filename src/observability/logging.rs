//! Leveled, thread-safe line logger.
//!
//! # Responsibilities
//! - Own exactly one sink, opened before construction and closed on drop
//! - Filter lines against the configured threshold
//! - Prefix every line with its severity tag, colored for terminal streams
//!
//! # Design Decisions
//! - The tag is produced by the pure [`prefix`] function; the only stateful
//!   operation is the mutex-guarded write of tag + message
//! - Standard streams are never closed; files are closed through the close
//!   action registered at construction
//! - Write errors are swallowed: logging never fails the caller

use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::config::{Config, LevelSetting, LogLevel};
use crate::lifecycle::Shared;

/// Destination of log lines.
pub type Sink = Box<dyn Write + Send>;

/// Action run on the sink when the logger is destroyed.
pub type CloseFn = Box<dyn FnOnce(Sink) -> io::Result<()> + Send>;

const RESET_COLOR: &str = "\x1b[0m";

/// Error type for logger construction.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("failed to open log file {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid log level {0:?}")]
    InvalidLevel(String),
}

/// Format the tag written in front of a line of the given severity.
pub fn prefix(level: LogLevel, color: bool) -> String {
    if color {
        format!("{}{}{} ", level_color(level), level.tag(), RESET_COLOR)
    } else {
        format!("{} ", level.tag())
    }
}

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "\x1b[0;37m\x1b[41m",
        LogLevel::Warn => "\x1b[0;37m\x1b[43m",
        LogLevel::Info => "\x1b[0;37m\x1b[44m",
        LogLevel::Debug => "\x1b[0;37m\x1b[42m",
        LogLevel::Trace => "\x1b[0;37m\x1b[45m",
    }
}

struct Output {
    sink: Option<Sink>,
    close: Option<CloseFn>,
}

/// Shared sink for diagnostic output.
pub struct Logger {
    level: LogLevel,
    color: bool,
    output: Mutex<Output>,
}

impl Logger {
    /// Wrap an already open sink.
    ///
    /// `close` is `None` for sinks whose lifetime the caller keeps, such as
    /// the standard streams. Coloring is off.
    pub fn create(
        level: LogLevel,
        sink: Option<Sink>,
        close: Option<CloseFn>,
    ) -> Result<Shared<Logger>, LoggerError> {
        let sink = sink.ok_or(LoggerError::InvalidArgument("null sink"))?;
        Ok(Shared::new(Self::build(level, sink, close, false)))
    }

    /// Build a logger for `config.log_path`.
    ///
    /// `"stdout"` and `"stderr"` select the standard streams with coloring on;
    /// anything else is a file opened in append mode, closed on destruction.
    pub fn from_config(config: &Config) -> Result<Shared<Logger>, LoggerError> {
        let level = match &config.log_level {
            LevelSetting::Level(level) => *level,
            LevelSetting::Unrecognized(level) => {
                return Err(LoggerError::InvalidLevel(level.clone()))
            }
        };

        let logger = match config.log_path.as_str() {
            "stdout" => Self::build(level, Box::new(io::stdout()), None, true),
            "stderr" => Self::build(level, Box::new(io::stderr()), None, true),
            path => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LoggerError::OpenFailed {
                        path: PathBuf::from(path),
                        source,
                    })?;
                let close: CloseFn = Box::new(|mut sink| sink.flush());
                Self::build(level, Box::new(file), Some(close), false)
            }
        };

        Ok(Shared::new(logger))
    }

    fn build(level: LogLevel, sink: Sink, close: Option<CloseFn>, color: bool) -> Self {
        Self {
            level,
            color,
            output: Mutex::new(Output {
                sink: Some(sink),
                close,
            }),
        }
    }

    /// Configured threshold.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns true if lines are colorized.
    pub fn color_enabled(&self) -> bool {
        self.color
    }

    /// Returns true if a line of `level` would be written.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level.admits(level)
    }

    /// Write one line at `level`, if the threshold admits it.
    pub fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let tag = prefix(level, self.color);
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sink) = output.sink.as_mut() {
            let _ = writeln!(sink, "{tag}{message}");
            let _ = sink.flush();
        }
    }

    pub fn error(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn trace(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Trace, message);
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let output = self.output.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(mut sink) = output.sink.take() else {
            return;
        };

        match output.close.take() {
            Some(close) => {
                let _ = close(sink);
            }
            None => {
                let _ = sink.flush();
            }
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}
