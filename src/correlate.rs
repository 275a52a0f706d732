//! Identifies which host block device an attach produced.

use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tokio::time::sleep;
use tracing::debug;

use crate::device::{DeviceSnapshot, HostDeviceInspector};
use crate::error::ConnectorError;

const SYS_BLOCK_ROOT: &str = "/sys/block";
const DEV_ROOT: &str = "/dev";

/// Diffs device enumerations around an attach and size-matches the result.
///
/// The compute service does not reliably report which device node a volume
/// became, so the correlator re-enumerates until something new appears and
/// then picks the first new device whose byte size equals the volume's.
/// Size equality is the sole correlation signal; a different device of
/// coincidentally identical size appearing in the same window would be
/// misattributed. The attach lock narrows that window to one attach at a
/// time but does not close it.
pub struct DeviceCorrelator<'a> {
    inspector: &'a dyn HostDeviceInspector,
    scan_interval: Duration,
    scan_timeout: Duration,
}

impl<'a> DeviceCorrelator<'a> {
    /// Builds a correlator polling with `scan_interval`, bounded by
    /// `scan_timeout`.
    #[must_use]
    pub const fn new(
        inspector: &'a dyn HostDeviceInspector,
        scan_interval: Duration,
        scan_timeout: Duration,
    ) -> Self {
        Self {
            inspector,
            scan_interval,
            scan_timeout,
        }
    }

    /// Returns the `/dev` path of the device that appeared since `before`
    /// and matches `expected_size` bytes exactly.
    ///
    /// When several new devices match, the first in enumeration order wins;
    /// that order is not guaranteed stable.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::DeviceNotFound`] when nothing new appears
    /// within the timeout or nothing size-matches, and
    /// [`ConnectorError::Inspect`] when the host devices cannot be read.
    pub async fn correlate(
        &self,
        before: &DeviceSnapshot,
        expected_size: u64,
    ) -> Result<Utf8PathBuf, ConnectorError> {
        let deadline = Instant::now() + self.scan_timeout;
        let mut appeared = self.inspector.enumerate()?.appeared_since(before);
        while appeared.is_empty() {
            if Instant::now() >= deadline {
                return Err(ConnectorError::DeviceNotFound {
                    message: format!(
                        "no new block device appeared within {:?}",
                        self.scan_timeout
                    ),
                });
            }
            sleep(self.scan_interval).await;
            appeared = self.inspector.enumerate()?.appeared_since(before);
        }
        debug!(devices = ?appeared, "new block devices since attach");

        for candidate in &appeared {
            if self.inspector.size_of(candidate)? == expected_size {
                return Ok(remap_to_dev(candidate));
            }
        }

        Err(ConnectorError::DeviceNotFound {
            message: format!(
                "none of {} new device(s) matched size {expected_size} bytes",
                appeared.len()
            ),
        })
    }
}

/// Remaps a device from the enumeration namespace to the addressable one.
/// Paths outside `/sys/block` are returned unchanged.
fn remap_to_dev(device: &Utf8Path) -> Utf8PathBuf {
    device.strip_prefix(SYS_BLOCK_ROOT).map_or_else(
        |_| device.to_path_buf(),
        |rel| Utf8Path::new(DEV_ROOT).join(rel),
    )
}
