//! Top-level attach/detach orchestration.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::cloud::{CloudVolumeApi, VolumeRecord, VolumeStatus};
use crate::config::ConnectorConfig;
use crate::correlate::DeviceCorrelator;
use crate::device::HostDeviceInspector;
use crate::error::ConnectorError;
use crate::exec::ShellExecutor;
use crate::link::LinkManager;
use crate::monitor::StateMonitor;

const ATTACH_TRANSITIONAL: &[VolumeStatus] =
    &[VolumeStatus::Available, VolumeStatus::Attaching];
const DETACH_TRANSITIONAL: &[VolumeStatus] = &[VolumeStatus::InUse, VolumeStatus::Detaching];

/// Named lock serializing attach operations.
///
/// Two concurrent attaches could each claim the other's newly appeared
/// device, so the device snapshot, the attach request, and the rescan all
/// happen under this lock. Its scope is the owning process: clones share
/// the lock, separate processes do not, and attaches racing from another
/// process on the same host are not guarded against.
#[derive(Clone, Debug)]
pub struct AttachLock {
    name: String,
    inner: Arc<Mutex<()>>,
}

impl AttachLock {
    /// Creates a lock identified by `name` in logs.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(())),
        }
    }

    async fn acquire(&self) -> MutexGuard<'_, ()> {
        debug!(lock = %self.name, "acquiring attach lock");
        self.inner.lock().await
    }
}

/// Per-operation options.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectOptions {
    /// Compute host to attach to or detach from. Falls back to the
    /// configured host id when absent.
    pub host_id: Option<String>,
}

/// Outcome of a successful attach.
///
/// The stable path stays valid only while its symlink exists; it is not
/// persisted anywhere else.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentResult {
    /// Stable local path representing the volume.
    pub path: Utf8PathBuf,
    /// Device node the path links to.
    pub device: Utf8PathBuf,
}

/// Orchestrates volume attach and detach against the cloud services and the
/// local host.
pub struct VolumeConnector {
    api: Arc<dyn CloudVolumeApi>,
    inspector: Arc<dyn HostDeviceInspector>,
    links: LinkManager,
    lock: AttachLock,
    default_host_id: Option<String>,
    state_poll_interval: Duration,
    state_wait_timeout: Duration,
    device_scan_interval: Duration,
    device_scan_timeout: Duration,
}

impl VolumeConnector {
    /// Wires a connector from its collaborators and configuration.
    ///
    /// The lock is injected so callers can share one lock across every
    /// connector that competes for the same host device namespace.
    #[must_use]
    pub fn new(
        api: Arc<dyn CloudVolumeApi>,
        inspector: Arc<dyn HostDeviceInspector>,
        executor: Arc<dyn ShellExecutor>,
        config: &ConnectorConfig,
        lock: AttachLock,
    ) -> Self {
        Self {
            links: LinkManager::new(Utf8PathBuf::from(&config.volume_link_dir), executor),
            default_host_id: config.host_id.clone(),
            state_poll_interval: config.state_poll_interval(),
            state_wait_timeout: config.state_wait_timeout(),
            device_scan_interval: config.device_scan_interval(),
            device_scan_timeout: config.device_scan_timeout(),
            api,
            inspector,
            lock,
        }
    }

    /// Returns the stable path `volume_id` is (or would be) published at.
    #[must_use]
    pub fn link_path(&self, volume_id: &str) -> Utf8PathBuf {
        self.links.path_for(volume_id)
    }

    /// Attaches `volume` to the target host and publishes its stable link.
    ///
    /// Holds the attach lock from before the device snapshot until the link
    /// is created or the operation fails; the guard releases it on every
    /// exit path. The snapshot must precede the attach request and the
    /// rescan must follow it, otherwise the device diff is meaningless.
    ///
    /// When link creation fails after a successful cloud attach, the volume
    /// is left attached and the error reports the inconsistency; no
    /// automatic detach is attempted, the caller decides.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::HostIdentity`] when no host id is
    /// available, [`ConnectorError::Cloud`] when a service call fails,
    /// [`ConnectorError::UnexpectedState`] / [`ConnectorError::WaitTimeout`]
    /// from the status wait, [`ConnectorError::DeviceNotFound`] when no new
    /// device matches, and [`ConnectorError::LinkCreation`] when publishing
    /// the link fails.
    pub async fn connect_volume(
        &self,
        volume: &VolumeRecord,
        options: &ConnectOptions,
    ) -> Result<AttachmentResult, ConnectorError> {
        let _guard = self.lock.acquire().await;

        let before = self.inspector.enumerate()?;
        let host_id = self.resolve_host_id(options)?;
        info!(volume_id = %volume.id, host_id = %host_id, "attaching volume");
        let handle = self.api.attach(&host_id, &volume.id).await?;
        debug!(attachment_id = %handle.id, "attach request accepted");

        let monitor = StateMonitor::new(
            self.api.as_ref(),
            volume.clone(),
            VolumeStatus::InUse,
            ATTACH_TRANSITIONAL,
            self.state_poll_interval,
            self.state_wait_timeout,
        );
        let attached = monitor.monitor().await?;

        let correlator = DeviceCorrelator::new(
            self.inspector.as_ref(),
            self.device_scan_interval,
            self.device_scan_timeout,
        );
        let device = correlator.correlate(&before, attached.size_bytes).await?;
        info!(volume_id = %attached.id, device = %device, "identified attached device");

        let path = self.links.create_link(&device, &attached.id)?;
        Ok(AttachmentResult { path, device })
    }

    /// Detaches `volume` from the target host and returns its final record.
    ///
    /// The volume is re-fetched first so a missing volume fails fast. Link
    /// removal is best-effort; every later step failure is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Cloud`] when the re-fetch or the detach
    /// request fails, [`ConnectorError::HostIdentity`] when no host id is
    /// available, and [`ConnectorError::UnexpectedState`] /
    /// [`ConnectorError::WaitTimeout`] from the status wait.
    pub async fn disconnect_volume(
        &self,
        volume: &VolumeRecord,
        options: &ConnectOptions,
    ) -> Result<VolumeRecord, ConnectorError> {
        let current = self.api.get(&volume.id).await?;

        self.links.remove_link(&current.id);

        let host_id = self.resolve_host_id(options)?;
        info!(volume_id = %current.id, host_id = %host_id, "detaching volume");
        self.api.detach(&host_id, &current.id).await?;

        let monitor = StateMonitor::new(
            self.api.as_ref(),
            current,
            VolumeStatus::Available,
            DETACH_TRANSITIONAL,
            self.state_poll_interval,
            self.state_wait_timeout,
        );
        monitor.monitor().await
    }

    fn resolve_host_id(&self, options: &ConnectOptions) -> Result<String, ConnectorError> {
        options
            .host_id
            .clone()
            .or_else(|| self.default_host_id.clone())
            .ok_or(ConnectorError::HostIdentity)
    }
}
