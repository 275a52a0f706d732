//! Attach/detach orchestration for remote block-storage volumes.
//!
//! The crate asks a compute service to attach a volume, waits for the
//! volume service to report it in use, works out which block device
//! appeared on the host as a result, and publishes a stable symlink for it.
//! Detach reverses the sequence with best-effort cleanup. The cloud
//! services, the device enumeration, and command execution all sit behind
//! traits so the orchestration can be driven by scripted fakes.

pub mod cloud;
pub mod config;
pub mod connector;
pub mod correlate;
pub mod device;
pub mod error;
pub mod exec;
pub mod link;
pub mod monitor;
pub mod test_support;

pub use cloud::{
    ApiFuture, AttachmentHandle, CloudApiError, CloudVolumeApi, HttpVolumeApi, VolumeRecord,
    VolumeStatus,
};
pub use config::{ConfigError, ConnectorConfig};
pub use connector::{AttachLock, AttachmentResult, ConnectOptions, VolumeConnector};
pub use correlate::DeviceCorrelator;
pub use device::{DeviceSnapshot, HostDeviceInspector, InspectError, SysBlockInspector};
pub use error::ConnectorError;
pub use exec::{CommandOutput, ExecError, ProcessExecutor, ShellExecutor};
pub use link::LinkManager;
pub use monitor::StateMonitor;
