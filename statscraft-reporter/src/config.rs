use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Reporter protocol version advertised to co-resident reporters and the API
pub const API_VERSION: u32 = 1;

/// Default report API base, versioned by `API_VERSION`
pub const DEFAULT_API_BASE_URL: &str = "http://api.statscraft.org/v1/report";

/// 10 minutes (12000 server ticks)
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 10 * 60;

pub const DEFAULT_BOOT_DELAY_MS: u64 = 1000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Name of the folder, next to the plugin data folders, holding the shared config
pub const CONFIG_FOLDER_NAME: &str = "StatsCraft";
pub const CONFIG_FILE_NAME: &str = "config.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReporterSettings {
    /// Base URL of the report endpoints, without trailing slash
    pub api_base_url: String,
    /// Settle delay after host boot before the election runs
    pub boot_delay_ms: u64,
    /// Interval of the recurring update report
    pub update_interval_secs: u64,
    /// Per-request timeout applied by the HTTP transport
    pub request_timeout_secs: u64,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            boot_delay_ms: DEFAULT_BOOT_DELAY_MS,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ReporterSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env::var("STATSCRAFT_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            boot_delay_ms: env_u64("STATSCRAFT_BOOT_DELAY_MS").unwrap_or(defaults.boot_delay_ms),
            update_interval_secs: env_u64("STATSCRAFT_UPDATE_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.update_interval_secs),
            request_timeout_secs: env_u64("STATSCRAFT_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
        }
    }

    pub fn plugin_url(&self) -> String {
        format!("{}/plugin", self.api_base_url)
    }

    pub fn server_url(&self) -> String {
        format!("{}/server", self.api_base_url)
    }

    pub fn update_url(&self) -> String {
        format!("{}/update", self.api_base_url)
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent sent with every report.
pub fn user_agent() -> String {
    format!("StatsCraft/{}", API_VERSION)
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
