use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

const DEFAULT_FETCH_INTERVAL_MS: u64 = 2000;
const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 10_000;
/// Without an explicit request timeout a request may take this many poll intervals
const REQUEST_TIMEOUT_INTERVALS: u32 = 5;

fn default_fetch_interval() -> u64 {
    DEFAULT_FETCH_INTERVAL_MS
}

fn default_device_timeout() -> u64 {
    DEFAULT_DEVICE_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

/// Static values the host page used to inject. Read once, before the
/// store is built, and never changed afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    pub navigation_task_id: u64,
    pub contest_id: u64,
    #[serde(default = "default_true")]
    pub display_map: bool,
    #[serde(default = "default_true")]
    pub display_table: bool,
    #[serde(default = "default_true")]
    pub live_mode: bool,
    #[serde(default)]
    pub login_link: Option<String>,
    #[serde(default)]
    pub logout_link: Option<String>,
    pub server_url: Url,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_ms: u64,
    #[serde(default)]
    pub traccar: Option<TraccarConfig>,
    #[serde(default = "default_device_timeout")]
    pub device_timeout_ms: u64,
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraccarConfig {
    pub url: Url,
    #[serde(default)]
    pub token: Option<String>,
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Configuration =
            serde_json::from_slice(&data).map_err(|source| Error::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_interval_ms == 0 {
            return Err(Error::Configuration(
                "fetch_interval_ms must be larger than zero".to_string(),
            ));
        }
        if self.device_timeout_ms == 0 {
            return Err(Error::Configuration(
                "device_timeout_ms must be larger than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(Error::Configuration(
                "request_timeout_ms must be larger than zero".to_string(),
            ));
        }
        if self.server_url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "server_url {} cannot be used as a base url",
                self.server_url
            )));
        }
        Ok(())
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_millis(self.device_timeout_ms)
    }

    /// Upper bound for a single HTTP request
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.fetch_interval() * REQUEST_TIMEOUT_INTERVALS)
    }
}

// Device Types

/// A tracker as known to the Traccar server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}
