//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Core (config, mount orchestration, server):
//!     → logging.rs (Logger::log, threshold check, tagged line under mutex)
//!
//! Engine + network internals:
//!     → tracing macros
//!     → layer.rs (LoggerLayer renders events)
//!     → logging.rs (same sink, same threshold)
//!
//! Sinks:
//!     → stdout / stderr (colored tags, never closed)
//!     → file (append mode, plain tags, closed on last release)
//! ```

pub mod layer;
pub mod logging;

pub use layer::{level_filter, LoggerLayer};
pub use logging::{prefix, CloseFn, Logger, LoggerError, Sink};
