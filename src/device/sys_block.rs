//! sysfs-backed device inspector.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};

use super::{DeviceSnapshot, HostDeviceInspector, InspectError};

const SECTOR_SIZE: u64 = 512;
const BLOCK_SUBDIR: &str = "block";
const ENUMERATION_ROOT: &str = "/sys/block";

/// Inspector that reads the `block` directory of a sysfs root.
///
/// Devices are reported under the `/sys/block` enumeration namespace
/// regardless of where the root is physically mounted, so a test can point
/// the inspector at a synthetic tree and still exercise the `/sys/block` →
/// `/dev` remapping downstream.
#[derive(Debug)]
pub struct SysBlockInspector {
    sys: Dir,
}

impl SysBlockInspector {
    /// Opens the host's real sysfs root.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError`] when `/sys` cannot be opened.
    pub fn open() -> Result<Self, InspectError> {
        Self::open_at(Utf8Path::new("/sys"))
    }

    /// Opens `root` as a sysfs root; it must contain a `block` directory.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError`] when the directory cannot be opened.
    pub fn open_at(root: &Utf8Path) -> Result<Self, InspectError> {
        let sys = Dir::open_ambient_dir(root, ambient_authority()).map_err(|err| InspectError {
            path: root.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self { sys })
    }
}

impl HostDeviceInspector for SysBlockInspector {
    fn enumerate(&self) -> Result<DeviceSnapshot, InspectError> {
        let listing = self.sys.read_dir(BLOCK_SUBDIR).map_err(|err| InspectError {
            path: Utf8PathBuf::from(ENUMERATION_ROOT),
            message: err.to_string(),
        })?;

        let mut devices = BTreeSet::new();
        for item in listing {
            let entry = item.map_err(|err| InspectError {
                path: Utf8PathBuf::from(ENUMERATION_ROOT),
                message: err.to_string(),
            })?;
            let name = entry.file_name().map_err(|err| InspectError {
                path: Utf8PathBuf::from(ENUMERATION_ROOT),
                message: err.to_string(),
            })?;
            devices.insert(Utf8PathBuf::from(format!("{ENUMERATION_ROOT}/{name}")));
        }
        Ok(DeviceSnapshot::new(devices))
    }

    fn size_of(&self, device: &Utf8Path) -> Result<u64, InspectError> {
        let name = device.file_name().ok_or_else(|| InspectError {
            path: device.to_path_buf(),
            message: String::from("device path has no final component"),
        })?;

        // The sysfs size attribute counts 512-byte sectors, independent of
        // the device's logical block size.
        let raw = self
            .sys
            .read_to_string(format!("{BLOCK_SUBDIR}/{name}/size"))
            .map_err(|err| InspectError {
                path: device.to_path_buf(),
                message: err.to_string(),
            })?;
        let sectors: u64 = raw.trim().parse().map_err(|err| InspectError {
            path: device.to_path_buf(),
            message: format!("invalid sector count: {err}"),
        })?;
        Ok(sectors.saturating_mul(SECTOR_SIZE))
    }
}
