//! Stable link management for attached volumes.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::error::ConnectorError;
use crate::exec::ShellExecutor;

/// Derives, creates, and removes the stable path for an attached volume.
///
/// The path is a symlink named after the volume id, so callers get the same
/// location across attaches regardless of which device node the kernel
/// hands out.
#[derive(Clone)]
pub struct LinkManager {
    base_dir: Utf8PathBuf,
    executor: Arc<dyn ShellExecutor>,
}

impl LinkManager {
    /// Creates a manager publishing links under `base_dir`.
    #[must_use]
    pub const fn new(base_dir: Utf8PathBuf, executor: Arc<dyn ShellExecutor>) -> Self {
        Self { base_dir, executor }
    }

    /// Returns the stable path for `volume_id`.
    ///
    /// Pure and deterministic: the same id always maps to the same path.
    #[must_use]
    pub fn path_for(&self, volume_id: &str) -> Utf8PathBuf {
        self.base_dir.join(volume_id)
    }

    /// Creates the stable symlink pointing at `device` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::LinkCreation`] when the link command fails.
    pub fn create_link(
        &self,
        device: &Utf8Path,
        volume_id: &str,
    ) -> Result<Utf8PathBuf, ConnectorError> {
        let link = self.path_for(volume_id);
        self.executor
            .execute(&["ln", "-s", device.as_str(), link.as_str()], true)
            .map_err(|err| ConnectorError::LinkCreation {
                path: link.clone(),
                message: err.to_string(),
            })?;
        info!(device = %device, link = %link, "published stable link");
        Ok(link)
    }

    /// Removes the stable symlink for `volume_id`, best-effort.
    ///
    /// Failures are logged and swallowed; cleanup must not block the rest of
    /// a detach.
    pub fn remove_link(&self, volume_id: &str) {
        let link = self.path_for(volume_id);
        if let Err(err) = self.executor.execute(&["rm", "-f", link.as_str()], true) {
            warn!(link = %link, error = %err, "failed to remove stable link");
        }
    }
}
