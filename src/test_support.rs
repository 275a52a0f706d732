//! Scripted fakes for the collaborator seams.
//!
//! Each fake returns pre-seeded responses in FIFO order and records the
//! calls made against it, so orchestration tests stay deterministic without
//! touching real services, sysfs, or processes. For the volume API and the
//! inspector the final queued response repeats once the queue drains, which
//! keeps timeout scenarios simple to script.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};

use crate::cloud::{ApiFuture, AttachmentHandle, CloudApiError, CloudVolumeApi, VolumeRecord};
use crate::device::{DeviceSnapshot, HostDeviceInspector, InspectError};
use crate::exec::{CommandOutput, ExecError, ShellExecutor};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call recorded by [`ScriptedVolumeApi`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApiCall {
    /// A volume record fetch.
    Get {
        /// Volume that was fetched.
        volume_id: String,
    },
    /// An attach request.
    Attach {
        /// Host the attach targeted.
        host_id: String,
        /// Volume the attach targeted.
        volume_id: String,
    },
    /// A detach request.
    Detach {
        /// Host the detach targeted.
        host_id: String,
        /// Volume the detach targeted.
        volume_id: String,
    },
}

/// Cloud API double returning scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedVolumeApi {
    records: Mutex<VecDeque<Result<VolumeRecord, CloudApiError>>>,
    attach_results: Mutex<VecDeque<Result<AttachmentHandle, CloudApiError>>>,
    detach_results: Mutex<VecDeque<Result<(), CloudApiError>>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl ScriptedVolumeApi {
    /// Creates a fake with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record to be returned by the next `get`.
    pub fn push_record(&self, record: VolumeRecord) {
        lock(&self.records).push_back(Ok(record));
    }

    /// Queues an error to be returned by the next `get`.
    pub fn push_get_error(&self, error: CloudApiError) {
        lock(&self.records).push_back(Err(error));
    }

    /// Queues an error for the next attach request; attaches succeed with a
    /// synthesised handle when nothing is queued.
    pub fn push_attach_error(&self, error: CloudApiError) {
        lock(&self.attach_results).push_back(Err(error));
    }

    /// Queues an error for the next detach request; detaches succeed when
    /// nothing is queued.
    pub fn push_detach_error(&self, error: CloudApiError) {
        lock(&self.detach_results).push_back(Err(error));
    }

    /// Returns every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    /// Number of `get` calls recorded so far.
    #[must_use]
    pub fn get_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, ApiCall::Get { .. }))
            .count()
    }

    fn next_record(&self, volume_id: &str) -> Result<VolumeRecord, CloudApiError> {
        let mut queue = lock(&self.records);
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.unwrap_or_else(|| {
            Err(CloudApiError::NotFound {
                volume_id: volume_id.to_owned(),
            })
        })
    }
}

impl CloudVolumeApi for ScriptedVolumeApi {
    fn attach<'a>(
        &'a self,
        host_id: &'a str,
        volume_id: &'a str,
    ) -> ApiFuture<'a, AttachmentHandle> {
        Box::pin(async move {
            lock(&self.calls).push(ApiCall::Attach {
                host_id: host_id.to_owned(),
                volume_id: volume_id.to_owned(),
            });
            lock(&self.attach_results).pop_front().unwrap_or_else(|| {
                Ok(AttachmentHandle {
                    id: format!("attachment-{volume_id}"),
                    volume_id: volume_id.to_owned(),
                    device: None,
                })
            })
        })
    }

    fn detach<'a>(&'a self, host_id: &'a str, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            lock(&self.calls).push(ApiCall::Detach {
                host_id: host_id.to_owned(),
                volume_id: volume_id.to_owned(),
            });
            lock(&self.detach_results).pop_front().unwrap_or(Ok(()))
        })
    }

    fn get<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, VolumeRecord> {
        Box::pin(async move {
            lock(&self.calls).push(ApiCall::Get {
                volume_id: volume_id.to_owned(),
            });
            self.next_record(volume_id)
        })
    }
}

/// Device inspector double returning scripted enumeration sequences.
#[derive(Debug, Default)]
pub struct ScriptedInspector {
    scans: Mutex<VecDeque<DeviceSnapshot>>,
    sizes: Mutex<BTreeMap<Utf8PathBuf, u64>>,
    scan_count: Mutex<usize>,
}

impl ScriptedInspector {
    /// Creates a fake with no scripted scans.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a snapshot to be returned by the next `enumerate`.
    pub fn push_scan(&self, snapshot: DeviceSnapshot) {
        lock(&self.scans).push_back(snapshot);
    }

    /// Sets the byte size reported for `device`.
    pub fn set_size(&self, device: impl Into<Utf8PathBuf>, size_bytes: u64) {
        lock(&self.sizes).insert(device.into(), size_bytes);
    }

    /// Number of `enumerate` calls made so far.
    #[must_use]
    pub fn scan_count(&self) -> usize {
        *lock(&self.scan_count)
    }
}

impl HostDeviceInspector for ScriptedInspector {
    fn enumerate(&self) -> Result<DeviceSnapshot, InspectError> {
        *lock(&self.scan_count) += 1;
        let mut queue = lock(&self.scans);
        let scan = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        scan.ok_or_else(|| InspectError {
            path: Utf8PathBuf::from("/sys/block"),
            message: String::from("no scripted scan"),
        })
    }

    fn size_of(&self, device: &Utf8Path) -> Result<u64, InspectError> {
        lock(&self.sizes)
            .get(device)
            .copied()
            .ok_or_else(|| InspectError {
                path: device.to_path_buf(),
                message: String::from("no scripted size"),
            })
    }
}

/// One call recorded by [`ScriptedExecutor`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecInvocation {
    /// Arguments as passed to the executor.
    pub argv: Vec<String>,
    /// Whether root was requested.
    pub run_as_root: bool,
}

impl ExecInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        self.argv.join(" ")
    }
}

/// Executor double returning scripted outcomes; defaults to success.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Result<CommandOutput, ExecError>>>,
    invocations: Mutex<Vec<ExecInvocation>>,
}

impl ScriptedExecutor {
    /// Creates a fake whose commands all succeed until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful exit for the next command.
    pub fn push_success(&self) {
        lock(&self.responses).push_back(Ok(CommandOutput {
            code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }));
    }

    /// Queues a failure for the next command.
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.responses).push_back(Err(ExecError {
            command: String::from("scripted"),
            message: message.into(),
        }));
    }

    /// Returns every invocation recorded so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<ExecInvocation> {
        lock(&self.invocations).clone()
    }
}

impl ShellExecutor for ScriptedExecutor {
    fn execute(&self, argv: &[&str], run_as_root: bool) -> Result<CommandOutput, ExecError> {
        lock(&self.invocations).push(ExecInvocation {
            argv: argv.iter().map(|arg| (*arg).to_owned()).collect(),
            run_as_root,
        });
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Ok(CommandOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        })
    }
}
