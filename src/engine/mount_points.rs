//! Endpoint registry.
//!
//! # Responsibilities
//! - Describe how each endpoint's media is produced ([`MediaFactory`])
//! - Map endpoint paths to factories, in registration order
//! - Resolve request paths (including per-track suffixes) to a mount
//!
//! # Design Decisions
//! - The registry is shared between the mount pass and the engine; a mutex
//!   serializes access, but two mount passes over one registry are not
//!   isolated from each other
//! - A path can be registered once; re-registering is an error, not a replace

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::config::Device;

/// Latency applied to device factories.
pub const DEVICE_LATENCY: Duration = Duration::from_millis(500);

/// Direction media flows through an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Clients pull media from the gateway.
    Play,
    /// Clients push media to the gateway.
    Record,
}

/// Launch description for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFactory {
    launch: String,
    transport_mode: TransportMode,
    latency: Duration,
}

impl MediaFactory {
    pub fn new(launch: impl Into<String>) -> Self {
        Self {
            launch: launch.into(),
            transport_mode: TransportMode::Play,
            latency: Duration::ZERO,
        }
    }

    /// Factory feeding media received at the endpoint into `device`.
    pub fn for_device(device: &Device) -> Self {
        Self::new(format!(
            "( decodebin name=depay0 ! pulsesink device={} )",
            device.name
        ))
        .with_transport_mode(TransportMode::Record)
        .with_latency(DEVICE_LATENCY)
    }

    pub fn with_transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport_mode = mode;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn launch(&self) -> &str {
        &self.launch
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

/// Per-device mount failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("device is missing a name or endpoint (name={name:?}, endpoint={endpoint:?})")]
    IncompleteDevice { name: String, endpoint: String },

    #[error("endpoint {0} is already mounted")]
    DuplicateEndpoint(String),

    #[error("invalid endpoint path {0:?}")]
    InvalidEndpoint(String),
}

/// Registry of mounted endpoints.
pub trait MountRegistry: Send + Sync {
    /// Register `factory` under `path`.
    fn add_factory(&self, path: &str, factory: MediaFactory) -> Result<(), MountError>;

    /// Remove the factory registered under `path`, returning it.
    fn remove_factory(&self, path: &str) -> Option<MediaFactory>;

    /// Factory registered under exactly `path`.
    fn lookup(&self, path: &str) -> Option<MediaFactory>;

    /// Registered paths, in registration order.
    fn paths(&self) -> Vec<String>;

    fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }
}

/// Returns true if `path` is a usable endpoint path (`/segment[/segment...]`).
pub fn is_valid_endpoint_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    !rest.is_empty()
        && rest.split('/').all(|segment| !segment.is_empty())
        && !rest.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// Shared, ordered mount table.
#[derive(Debug, Clone, Default)]
pub struct MountPoints {
    mounts: Arc<Mutex<Vec<(String, MediaFactory)>>>,
}

impl MountPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a request path to its mount.
    ///
    /// Matches the longest registered path equal to `path` or followed by a
    /// `/` in it, so `/kitchen/stream=0` resolves to `/kitchen`.
    pub fn match_path(&self, path: &str) -> Option<(String, MediaFactory)> {
        let path = path.trim_end_matches('/');
        let mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        mounts
            .iter()
            .filter(|(mount, _)| {
                path == mount
                    || path
                        .strip_prefix(mount.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(mount, _)| mount.len())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.mounts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MountRegistry for MountPoints {
    fn add_factory(&self, path: &str, factory: MediaFactory) -> Result<(), MountError> {
        if !is_valid_endpoint_path(path) {
            return Err(MountError::InvalidEndpoint(path.to_string()));
        }

        let mut mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        if mounts.iter().any(|(mount, _)| mount == path) {
            return Err(MountError::DuplicateEndpoint(path.to_string()));
        }
        mounts.push((path.to_string(), factory));
        Ok(())
    }

    fn remove_factory(&self, path: &str) -> Option<MediaFactory> {
        let mut mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        let index = mounts.iter().position(|(mount, _)| mount == path)?;
        Some(mounts.remove(index).1)
    }

    fn lookup(&self, path: &str) -> Option<MediaFactory> {
        let mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        mounts
            .iter()
            .find(|(mount, _)| mount == path)
            .map(|(_, factory)| factory.clone())
    }

    fn paths(&self) -> Vec<String> {
        let mounts = self.mounts.lock().unwrap_or_else(PoisonError::into_inner);
        mounts.iter().map(|(mount, _)| mount.clone()).collect()
    }
}
