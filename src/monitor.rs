//! Poll-until-target-state primitive.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::cloud::{CloudVolumeApi, VolumeRecord, VolumeStatus};
use crate::error::ConnectorError;

/// Waits for a volume to reach a target status.
///
/// The volume is re-fetched on every iteration. Three terminal outcomes:
/// the target status (success), a status outside the transitional set
/// ([`ConnectorError::UnexpectedState`], never retried), or the deadline
/// passing while still transitional ([`ConnectorError::WaitTimeout`]).
pub struct StateMonitor<'a> {
    api: &'a dyn CloudVolumeApi,
    volume: VolumeRecord,
    target: VolumeStatus,
    transitional: &'a [VolumeStatus],
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl<'a> StateMonitor<'a> {
    /// Builds a monitor from the fetch capability, the volume's last known
    /// record, the target status, and the statuses the volume is allowed to
    /// pass through on the way there.
    #[must_use]
    pub const fn new(
        api: &'a dyn CloudVolumeApi,
        volume: VolumeRecord,
        target: VolumeStatus,
        transitional: &'a [VolumeStatus],
        poll_interval: Duration,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            api,
            volume,
            target,
            transitional,
            poll_interval,
            wait_timeout,
        }
    }

    /// Polls until the volume reaches the target status and returns the
    /// fresh record.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::UnexpectedState`] the moment a status
    /// outside the transitional set is observed,
    /// [`ConnectorError::WaitTimeout`] when the deadline passes, and
    /// [`ConnectorError::Cloud`] when a fetch fails.
    pub async fn monitor(self) -> Result<VolumeRecord, ConnectorError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let current = self.api.get(&self.volume.id).await?;
            if current.status == self.target {
                debug!(volume_id = %current.id, status = %current.status, "volume reached target status");
                return Ok(current);
            }
            if !self.transitional.contains(&current.status) {
                return Err(ConnectorError::UnexpectedState {
                    volume_id: current.id,
                    status: current.status,
                });
            }
            if Instant::now() >= deadline {
                return Err(ConnectorError::WaitTimeout {
                    action: format!("status '{}'", self.target),
                    volume_id: current.id,
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests;
