//! Volume and compute service collaborators.
//!
//! The connector never owns volume records; it reads them from the volume
//! service and asks the compute service to attach or detach them. Both
//! services sit behind the [`CloudVolumeApi`] trait so orchestration can be
//! exercised against scripted fakes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

mod http;

pub use http::HttpVolumeApi;

/// Future returned by cloud API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CloudApiError>> + Send + 'a>>;

/// Status reported by the volume service.
///
/// The four known states drive the attach/detach wait loops; anything else
/// arrives as [`VolumeStatus::Other`] and is treated as a terminal error when
/// observed mid-wait.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VolumeStatus {
    /// Volume exists and is not attached anywhere.
    Available,
    /// Attach requested, not yet complete.
    Attaching,
    /// Volume is attached to a compute host.
    InUse,
    /// Detach requested, not yet complete.
    Detaching,
    /// Any status outside the known set, kept verbatim.
    Other(String),
}

impl From<&str> for VolumeStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "available" => Self::Available,
            "attaching" => Self::Attaching,
            "in-use" => Self::InUse,
            "detaching" => Self::Detaching,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for VolumeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("available"),
            Self::Attaching => f.write_str("attaching"),
            Self::InUse => f.write_str("in-use"),
            Self::Detaching => f.write_str("detaching"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Local copy of a volume record fetched from the volume service.
///
/// Always a point-in-time observation; callers re-fetch before acting rather
/// than assuming the copy is still current.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeRecord {
    /// Identifier assigned by the volume service.
    pub id: String,
    /// Declared size in bytes.
    pub size_bytes: u64,
    /// Status at the time of the fetch.
    pub status: VolumeStatus,
}

/// Handle returned by the compute service when an attach is accepted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentHandle {
    /// Attachment identifier assigned by the compute service.
    pub id: String,
    /// Volume the attachment refers to.
    pub volume_id: String,
    /// Device name the compute service claims to have used. Often absent or
    /// wrong, which is why the connector correlates devices itself.
    pub device: Option<String>,
}

/// Errors raised by cloud API implementations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CloudApiError {
    /// Raised when the volume does not exist on the volume service.
    #[error("volume {volume_id} not found")]
    NotFound {
        /// Volume identifier that was looked up.
        volume_id: String,
    },
    /// Raised when either service rejects a request.
    #[error("cloud API rejected request with status {status}: {message}")]
    Api {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error body returned by the service.
        message: String,
    },
    /// Raised when the request never reaches the service.
    #[error("cloud API transport failure: {message}")]
    Transport {
        /// Human-readable transport error.
        message: String,
    },
}

/// Operations the connector needs from the volume and compute services.
pub trait CloudVolumeApi: Send + Sync {
    /// Asks the compute service to attach `volume_id` to `host_id`.
    fn attach<'a>(&'a self, host_id: &'a str, volume_id: &'a str)
    -> ApiFuture<'a, AttachmentHandle>;

    /// Asks the compute service to detach `volume_id` from `host_id`.
    fn detach<'a>(&'a self, host_id: &'a str, volume_id: &'a str) -> ApiFuture<'a, ()>;

    /// Fetches the current record for `volume_id` from the volume service.
    ///
    /// Implementations must report a missing volume as
    /// [`CloudApiError::NotFound`] so callers can fail fast on detach.
    fn get<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, VolumeRecord>;
}

#[cfg(test)]
mod tests;
