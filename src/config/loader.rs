//! Configuration loading from disk.
//!
//! A load reads the whole file, parses it into a document and merges the
//! recognized fields onto the current values. Fields absent from the document
//! keep whatever the config already held, so a fresh config ends up with the
//! defaults for anything the document leaves out.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::config::schema::{Config, Device, LevelSetting, LogLevel};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open config file {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seek config file {path}: {source}")]
    SeekFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to allocate {size} byte buffer for config file {path}")]
    AllocFailed { path: PathBuf, size: u64 },

    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// Reasons a document could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl Config {
    /// Create a config holding the defaults.
    pub fn create() -> Self {
        Self::default()
    }

    /// Load `path` and merge its fields into this config.
    ///
    /// Devices in the document are appended to the ones already held; other
    /// present fields override the current values.
    ///
    /// On success the previously held document is replaced (and dropped). On
    /// failure the config is left untouched: the document is fully parsed
    /// before any field is merged.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let buffer = read_source(path)?;
        let document = parse_document(path, &buffer).map_err(|source| LoadError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?;

        self.apply_document(document);
        Ok(())
    }

    /// Merge an already parsed document and keep it as the current one.
    pub fn apply_document(&mut self, document: Value) {
        self.merge(&document);
        self.document = Some(document);
    }

    /// The last document merged into this config.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    /// Visit every device in insertion order and collect each visit's result.
    ///
    /// Every device is visited even when an earlier visit fails; reducing the
    /// results is up to the caller.
    pub fn iterate_devices<T, F>(&self, visit: F) -> Vec<T>
    where
        F: FnMut(&Device) -> T,
    {
        self.devices.iter().map(visit).collect()
    }

    fn merge(&mut self, document: &Value) {
        match document.get("port") {
            Some(Value::String(port)) => self.port = port.clone(),
            Some(Value::Number(port)) => self.port = port.to_string(),
            _ => {}
        }

        if let Some(log) = document.get("log").filter(|log| log.is_object()) {
            if let Some(path) = log.get("path").and_then(Value::as_str) {
                self.log_path = path.to_string();
            }

            if let Some(level) = log.get("level").and_then(Value::as_str) {
                self.log_level = match LogLevel::from_config_str(level) {
                    Some(level) => LevelSetting::Level(level),
                    None => LevelSetting::Unrecognized(level.to_string()),
                };
            }
        }

        if let Some(devices) = document.get("devices").and_then(Value::as_array) {
            self.devices.extend(devices.iter().map(parse_device));
        }
    }
}

fn parse_device(entry: &Value) -> Device {
    let field = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Device {
        name: field("name"),
        endpoint: field("endpoint"),
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>, LoadError> {
    let mut file = File::open(path).map_err(|source| LoadError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let seek_failed = |source| LoadError::SeekFailed {
        path: path.to_path_buf(),
        source,
    };
    let size = file.seek(SeekFrom::End(0)).map_err(seek_failed)?;
    file.seek(SeekFrom::Start(0)).map_err(seek_failed)?;

    let alloc_failed = || LoadError::AllocFailed {
        path: path.to_path_buf(),
        size,
    };
    let capacity = usize::try_from(size).map_err(|_| alloc_failed())?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| alloc_failed())?;

    file.read_to_end(&mut buffer)
        .map_err(|source| LoadError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(buffer)
}

fn parse_document(path: &Path, buffer: &[u8]) -> Result<Value, ParseError> {
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        let text = std::str::from_utf8(buffer)?;
        let document: toml::Value = toml::from_str(text)?;
        Ok(serde_json::to_value(document)?)
    } else {
        Ok(serde_json::from_slice(buffer)?)
    }
}
