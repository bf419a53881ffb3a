//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Config::create() (defaults: port 8554, level info, log to stdout)
//!     → loader.rs (read file, parse JSON/TOML, merge present fields)
//!     → validation.rs (port range, log path length, log level)
//!     → Config (validated, immutable from here on)
//!     → shared via Shared<Config> with the logger and server
//! ```
//!
//! # Design Decisions
//! - Loading is a field-level merge onto the current values, not a replacement
//! - An unrecognized log level is stored as an explicit invalid setting
//! - Validation is separate from loading and must be checked by the caller

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadError, ParseError};
pub use schema::{Config, Device, LevelSetting, LogLevel};
pub use validation::{parse_port, validate_config, ValidationError};
