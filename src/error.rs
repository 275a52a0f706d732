//! Error type shared by the attach/detach engine.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::cloud::{CloudApiError, VolumeStatus};
use crate::device::InspectError;

/// Errors raised while connecting or disconnecting a volume.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConnectorError {
    /// Raised when a volume enters a status outside the acceptable set while
    /// a wait loop is running. Never retried.
    #[error("volume {volume_id} entered unexpected status {status}")]
    UnexpectedState {
        /// Volume being waited on.
        volume_id: String,
        /// Status that was observed.
        status: VolumeStatus,
    },
    /// Raised when a wait loop exhausts its timeout in a transitional state.
    #[error("timeout waiting for {action} on volume {volume_id}")]
    WaitTimeout {
        /// Action being waited on.
        action: String,
        /// Volume being waited on.
        volume_id: String,
    },
    /// Raised when no newly appeared block device could be matched to the
    /// attached volume.
    #[error("no matching block device found: {message}")]
    DeviceNotFound {
        /// What the correlation attempt observed.
        message: String,
    },
    /// Raised when the stable link cannot be created. The volume stays
    /// attached at the cloud layer.
    #[error("failed to create link {path}: {message}")]
    LinkCreation {
        /// Link path that could not be created.
        path: Utf8PathBuf,
        /// Diagnostic text from the failed command.
        message: String,
    },
    /// Raised when no compute host id was supplied and none is configured.
    #[error("no compute host id supplied and none configured")]
    HostIdentity,
    /// Failure from the volume or compute service, propagated unchanged.
    #[error(transparent)]
    Cloud(#[from] CloudApiError),
    /// Failure reading host block devices.
    #[error(transparent)]
    Inspect(#[from] InspectError),
}
