//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_LINK_DIR: &str = "/var/lib/blocklink/by-id";
const DEFAULT_LOCK_NAME: &str = "blocklink-attach-volume";
const DEFAULT_STATE_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_STATE_WAIT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_DEVICE_SCAN_INTERVAL_MS: u64 = 300;
const DEFAULT_DEVICE_SCAN_TIMEOUT_SECS: u64 = 10;

/// Connector configuration derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "BLK")]
pub struct ConnectorConfig {
    /// Volume service endpoint, including any project scoping the service
    /// requires. Only needed when constructing the HTTP client.
    pub volume_api_url: Option<String>,
    /// Compute service endpoint.
    pub compute_api_url: Option<String>,
    /// Authentication token passed to both services.
    pub auth_token: Option<String>,
    /// Compute host this process attaches volumes to. Callers may override
    /// it per operation; with neither supplied, operations fail.
    pub host_id: Option<String>,
    /// Directory where stable volume links are published.
    #[ortho_config(default = DEFAULT_LINK_DIR.to_owned())]
    pub volume_link_dir: String,
    /// Name of the lock serializing attach operations.
    #[ortho_config(default = DEFAULT_LOCK_NAME.to_owned())]
    pub attach_lock_name: String,
    /// Interval between volume status polls, in milliseconds.
    #[ortho_config(default = DEFAULT_STATE_POLL_INTERVAL_MS)]
    pub state_poll_interval_ms: u64,
    /// Upper bound on a status wait, in seconds.
    #[ortho_config(default = DEFAULT_STATE_WAIT_TIMEOUT_SECS)]
    pub state_wait_timeout_secs: u64,
    /// Interval between device rescans, in milliseconds.
    #[ortho_config(default = DEFAULT_DEVICE_SCAN_INTERVAL_MS)]
    pub device_scan_interval_ms: u64,
    /// Upper bound on the device scan, in seconds.
    #[ortho_config(default = DEFAULT_DEVICE_SCAN_TIMEOUT_SECS)]
    pub device_scan_timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            volume_api_url: None,
            compute_api_url: None,
            auth_token: None,
            host_id: None,
            volume_link_dir: DEFAULT_LINK_DIR.to_owned(),
            attach_lock_name: DEFAULT_LOCK_NAME.to_owned(),
            state_poll_interval_ms: DEFAULT_STATE_POLL_INTERVAL_MS,
            state_wait_timeout_secs: DEFAULT_STATE_WAIT_TIMEOUT_SECS,
            device_scan_interval_ms: DEFAULT_DEVICE_SCAN_INTERVAL_MS,
            device_scan_timeout_secs: DEFAULT_DEVICE_SCAN_TIMEOUT_SECS,
        }
    }
}

impl ConnectorConfig {
    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, and environment variables in that
    /// order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge
    /// sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Interval between volume status polls.
    #[must_use]
    pub const fn state_poll_interval(&self) -> Duration {
        Duration::from_millis(self.state_poll_interval_ms)
    }

    /// Upper bound on a status wait.
    #[must_use]
    pub const fn state_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.state_wait_timeout_secs)
    }

    /// Interval between device rescans.
    #[must_use]
    pub const fn device_scan_interval(&self) -> Duration {
        Duration::from_millis(self.device_scan_interval_ms)
    }

    /// Upper bound on the device scan.
    #[must_use]
    pub const fn device_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.device_scan_timeout_secs)
    }
}

/// Errors raised when loading configuration.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Raised when the configuration loader fails to merge sources.
    #[error("failed to load configuration: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_timings() {
        let config = ConnectorConfig::default();
        assert_eq!(config.state_poll_interval(), Duration::from_secs(1));
        assert_eq!(config.state_wait_timeout(), Duration::from_secs(300));
        assert_eq!(config.device_scan_interval(), Duration::from_millis(300));
        assert_eq!(config.device_scan_timeout(), Duration::from_secs(10));
        assert_eq!(config.volume_link_dir, "/var/lib/blocklink/by-id");
        assert_eq!(config.attach_lock_name, "blocklink-attach-volume");
        assert_eq!(config.host_id, None);
    }
}
