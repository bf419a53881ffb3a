//! Bridge from `tracing` events into the [`Logger`].
//!
//! Engine and network internals use the `tracing` macros; this layer renders
//! their events as ordinary log lines so everything lands in one sink with
//! one threshold.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::LogLevel;
use crate::lifecycle::Shared;
use crate::observability::logging::Logger;

/// Map a `tracing` level onto a log severity.
pub fn log_level(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else if *level == Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

/// The `tracing` filter equivalent to a configured threshold.
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// A `tracing_subscriber` layer writing every event through a [`Logger`].
#[derive(Debug)]
pub struct LoggerLayer {
    logger: Shared<Logger>,
}

impl LoggerLayer {
    pub fn new(logger: Shared<Logger>) -> Self {
        Self { logger }
    }
}

impl<S: Subscriber> Layer<S> for LoggerLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut line = LineVisitor::default();
        event.record(&mut line);
        self.logger.log(
            level,
            format_args!("{}: {}{}", metadata.target(), line.message, line.fields),
        );
    }
}

/// Collects the `message` field and renders the rest as `key=value`.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
