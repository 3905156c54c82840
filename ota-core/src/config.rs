/// Updater configuration that can be tested independently
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum time between two unforced update checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shortest interval an updater will honour; shorter configured values are raised to it
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Connect/response timeout used by the HTTP transport. Not configurable.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("manifest URL cannot be empty")]
    EmptyManifestUrl,
    #[error("manifest URL must start with http:// or https://: {0}")]
    UnsupportedScheme(String),
    #[error("check interval must be at least one second")]
    ZeroInterval,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// URL of the update manifest text file
    pub manifest_url: String,
    /// Version number of the firmware that is running now
    pub current_version: u32,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u32,
}

fn default_check_interval_secs() -> u32 {
    DEFAULT_CHECK_INTERVAL.as_secs() as u32
}

impl UpdaterConfig {
    pub fn new(manifest_url: impl Into<String>, current_version: u32) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            current_version,
            check_interval_secs: default_check_interval_secs(),
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_secs = interval.as_secs().min(u32::MAX as u64) as u32;
        self
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs as u64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.manifest_url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyManifestUrl);
        }
        let lower = url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Err(ConfigError::UnsupportedScheme(self.manifest_url.clone()));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}
