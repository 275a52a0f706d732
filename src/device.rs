//! Host block-device observation.
//!
//! Attach correlation works on point-in-time snapshots of the devices the
//! host can see. The inspector seam keeps the sysfs plumbing out of the
//! correlation logic so tests can script enumeration sequences.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

mod sys_block;

pub use sys_block::SysBlockInspector;

/// Immutable set of block devices observed at one point in time.
///
/// Snapshots are only ever compared by set difference; enumeration order
/// carries no meaning.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceSnapshot {
    devices: BTreeSet<Utf8PathBuf>,
}

impl DeviceSnapshot {
    /// Wraps an already-collected device set.
    #[must_use]
    pub const fn new(devices: BTreeSet<Utf8PathBuf>) -> Self {
        Self { devices }
    }

    /// Returns the devices present in `self` but not in `earlier`.
    #[must_use]
    pub fn appeared_since(&self, earlier: &Self) -> Vec<Utf8PathBuf> {
        self.devices.difference(&earlier.devices).cloned().collect()
    }

    /// Number of devices in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` when the snapshot holds no devices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<Utf8PathBuf> for DeviceSnapshot {
    fn from_iter<I: IntoIterator<Item = Utf8PathBuf>>(iter: I) -> Self {
        Self {
            devices: iter.into_iter().collect(),
        }
    }
}

/// Raised when the host's block devices cannot be read.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("failed to inspect {path}: {message}")]
pub struct InspectError {
    /// Path that could not be read.
    pub path: Utf8PathBuf,
    /// Human-readable error message.
    pub message: String,
}

/// Enumerates host block devices and reports their sizes.
pub trait HostDeviceInspector: Send + Sync {
    /// Captures a snapshot of every block device currently visible.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError`] when the device listing cannot be read.
    fn enumerate(&self) -> Result<DeviceSnapshot, InspectError>;

    /// Reports the size of `device` in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError`] when the device's size cannot be read.
    fn size_of(&self, device: &Utf8Path) -> Result<u64, InspectError>;
}

#[cfg(test)]
mod tests;
