//! Interfaces to the host server the reporter is embedded in.
//!
//! The reporter never talks to the host directly; the embedding plugin hands
//! it implementations of these traits.

use statscraft_types::{OsInfo, PluginDescription, RuntimeInfo};
use std::sync::Arc;

/// The plugin embedding a reporter.
pub trait PluginHandle: Send + Sync {
    /// Plugin name, unique within the host
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn description(&self) -> PluginDescription;
}

/// How the host exposes its connected players.
///
/// Hosts differ in API generation; the host answers with whichever shape
/// it supports instead of the reporter probing for methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCountApi {
    /// Current API: a sized collection of online players
    Modern { online: usize },
    /// Legacy API: a snapshot array of online player names
    Legacy { players: Vec<String> },
    /// The host could not answer
    Unavailable,
}

impl PlayerCountApi {
    /// Connected client count, -1 when unavailable.
    pub fn online_count(&self) -> i64 {
        match self {
            PlayerCountApi::Modern { online } => *online as i64,
            PlayerCountApi::Legacy { players } => players.len() as i64,
            PlayerCountApi::Unavailable => -1,
        }
    }
}

/// Host-level facts for the server snapshot and update reports.
pub trait HostEnvironment: Send + Sync {
    /// Server API version string (e.g. "1.20.4-R0.1-SNAPSHOT")
    fn server_version(&self) -> String;

    /// Game version string (e.g. "git-Paper-496 (MC: 1.20.4)")
    fn game_version(&self) -> String;

    /// Whether clients are authenticated against the account service
    fn online_mode(&self) -> bool;

    fn world_count(&self) -> usize;

    fn plugin_count(&self) -> usize;

    fn default_game_mode(&self) -> String;

    fn runtime(&self) -> RuntimeInfo;

    fn player_count_api(&self) -> PlayerCountApi;
}

/// Plugin lifecycle notification delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginEvent {
    Enabled(String),
    Disabled(String),
}

impl PluginEvent {
    pub fn plugin_name(&self) -> &str {
        match self {
            PluginEvent::Enabled(name) | PluginEvent::Disabled(name) => name,
        }
    }
}

pub type PluginEventHandler = Arc<dyn Fn(&PluginEvent) + Send + Sync>;

/// Opaque handle returned by `LifecycleNotifications::subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

/// The host's plugin enable/disable notification stream.
pub trait LifecycleNotifications: Send + Sync {
    fn subscribe(&self, handler: PluginEventHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: &SubscriptionId);
}

/// Detect operating system facts of the current process.
pub fn detect_os() -> OsInfo {
    OsInfo {
        name: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        version: os_version().unwrap_or_else(|| "unknown".to_string()),
        core_count: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

#[cfg(target_os = "linux")]
fn os_version() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(not(target_os = "linux"))]
fn os_version() -> Option<String> {
    None
}
