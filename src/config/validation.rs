//! Configuration validation.
//!
//! # Responsibilities
//! - Check the port is an integer in `1..=65535`
//! - Check the log path fits the platform path limit
//! - Reject a log level that did not match one of the five levels
//!
//! # Design Decisions
//! - Validation is a pure function: `&Config → Result<(), ValidationError>`
//! - Fields are checked in declaration order and the first failure is reported
//! - The config is never mutated

use thiserror::Error;

use crate::config::schema::{Config, LevelSetting};

/// Longest accepted log path, in bytes (Linux `PATH_MAX`).
pub const MAX_LOG_PATH_LEN: usize = 4096;

/// A semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid port {0:?}: expected an integer between 1 and 65535")]
    InvalidPort(String),

    #[error("log path exceeds {MAX_LOG_PATH_LEN} bytes ({0} bytes)")]
    LogPathTooLong(usize),

    #[error("invalid log level {0:?}: expected one of error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// Parse a port string. Non-numeric text and out-of-range values yield `None`.
pub fn parse_port(port: &str) -> Option<u16> {
    port.trim().parse::<u16>().ok().filter(|port| *port >= 1)
}

/// Validate a configuration.
pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
    if parse_port(&config.port).is_none() {
        return Err(ValidationError::InvalidPort(config.port.clone()));
    }

    if config.log_path.len() > MAX_LOG_PATH_LEN {
        return Err(ValidationError::LogPathTooLong(config.log_path.len()));
    }

    if let LevelSetting::Unrecognized(level) = &config.log_level {
        return Err(ValidationError::InvalidLogLevel(level.clone()));
    }

    Ok(())
}

impl Config {
    /// Validate this config. See [`validate_config`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_port(port: &str) -> Config {
        Config {
            port: port.to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn ports_in_range_are_accepted() {
        for port in ["1", "80", "8554", "65535", " 9000 "] {
            assert_eq!(with_port(port).validate(), Ok(()), "port {port:?}");
        }
    }

    #[test]
    fn ports_out_of_range_are_rejected() {
        for port in ["0", "65536", "-1", "100000", "", "abc", "80abc", "8.5"] {
            assert_eq!(
                with_port(port).validate(),
                Err(ValidationError::InvalidPort(port.to_string())),
                "port {port:?}"
            );
        }
    }

    #[test]
    fn long_log_path_is_rejected() {
        let config = Config {
            log_path: "x".repeat(MAX_LOG_PATH_LEN + 1),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::LogPathTooLong(MAX_LOG_PATH_LEN + 1))
        );

        let config = Config {
            log_path: "x".repeat(MAX_LOG_PATH_LEN),
            ..Config::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn unrecognized_level_is_rejected() {
        let config = Config {
            log_level: LevelSetting::Unrecognized("loud".into()),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidLogLevel("loud".into()))
        );
    }

    #[test]
    fn port_is_reported_first() {
        let config = Config {
            port: "0".into(),
            log_level: LevelSetting::Unrecognized("loud".into()),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort(_))
        ));
    }
}
