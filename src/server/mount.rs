//! Mount orchestration.
//!
//! Turns the configured device list into registered endpoints in one pass.
//! Every device is attempted, in list order; per-device results are collected
//! and reduced into a [`MountReport`] afterwards. A failed device does not
//! stop later devices from being mounted, and nothing is rolled back here:
//! callers that need all-or-nothing use [`unmount`] on their error path.

use crate::config::{Config, Device};
use crate::engine::{MediaFactory, MountError, MountRegistry};
use crate::observability::Logger;

/// A device that could not be mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFailure {
    /// Position in the configured device list.
    pub index: usize,
    pub device: Device,
    pub error: MountError,
}

/// Outcome of a mount pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    /// Registered endpoint paths, in list order.
    pub mounted: Vec<String>,
    pub failures: Vec<DeviceFailure>,
}

impl MountReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of devices attempted.
    pub fn total(&self) -> usize {
        self.mounted.len() + self.failures.len()
    }
}

/// Register one device with the registry, returning its endpoint path.
pub fn mount_device(
    registry: &dyn MountRegistry,
    device: &Device,
    logger: &Logger,
) -> Result<String, MountError> {
    if !device.is_mountable() {
        return Err(MountError::IncompleteDevice {
            name: device.name.clone(),
            endpoint: device.endpoint.clone(),
        });
    }

    let path = device.endpoint_path();
    let factory = MediaFactory::for_device(device);
    let launch = factory.launch().to_string();
    registry.add_factory(&path, factory)?;

    logger.info(format_args!(
        "mounted device \"{}\" at endpoint {}",
        device.name, path
    ));
    logger.debug(format_args!("launch string: {launch}"));
    Ok(path)
}

/// Mount every configured device.
pub fn mount_devices(config: &Config, registry: &dyn MountRegistry, logger: &Logger) -> MountReport {
    let results = config.iterate_devices(|device| {
        let result = mount_device(registry, device, logger);
        if let Err(e) = &result {
            logger.error(format_args!(
                "failed to mount device \"{}\": {e}",
                device.name
            ));
        }
        result
    });

    let mut report = MountReport::default();
    for (index, (device, result)) in config.devices.iter().zip(results).enumerate() {
        match result {
            Ok(path) => report.mounted.push(path),
            Err(error) => report.failures.push(DeviceFailure {
                index,
                device: device.clone(),
                error,
            }),
        }
    }
    report
}

/// Remove previously mounted endpoints.
pub fn unmount(registry: &dyn MountRegistry, paths: &[String], logger: &Logger) {
    for path in paths {
        if registry.remove_factory(path).is_some() {
            logger.debug(format_args!("unmounted endpoint {path}"));
        }
    }
}
