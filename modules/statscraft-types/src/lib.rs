//! Shared types for the StatsCraft reporter and the services that consume its reports.

use serde::{Deserialize, Serialize};

// =====================================================
// Installation
// =====================================================

/// The per-installation record kept in `StatsCraft/config.yml`.
///
/// One record is shared by every plugin on the same server, so the `uuid`
/// identifies the server installation, not an individual plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub uuid: String,
    #[serde(rename = "opt-out")]
    pub opt_out: bool,
}

/// The record as it was found on disk, before validation.
///
/// Any field may be absent or of the wrong type; the reporter repairs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredInstallation {
    pub uuid: Option<String>,
    pub opt_out: Option<bool>,
}

// =====================================================
// Plugin identity
// =====================================================

/// Descriptive metadata of the plugin embedding a reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescription {
    /// Name including version, e.g. "WorldGuard v7.0.9"
    pub full_name: String,
    pub version: String,
    pub description: Option<String>,
    pub website: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub depend: Vec<String>,
    #[serde(default)]
    pub soft_depend: Vec<String>,
}

// =====================================================
// Host environment
// =====================================================

/// Runtime the host server runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    /// Maximum memory the runtime may address, in bytes
    pub max_memory: u64,
}

/// Operating system facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub core_count: usize,
}

/// One-time description of the host, sent by the leader only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub uuid: String,
    pub os: OsInfo,
    pub runtime: RuntimeInfo,
    pub server_version: String,
    pub game_version: String,
    pub online_mode: bool,
    pub worlds_count: usize,
    pub plugins_count: usize,
    pub default_game_mode: String,
}

/// Recurring update, sent by the leader on every interval tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSnapshot {
    pub uuid: String,
    /// Connected clients, or -1 when the host could not tell
    pub player_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_record_uses_dashed_opt_out_key() {
        let record = InstallationRecord {
            uuid: "6f1c2b1e-3f0a-4a43-9a7c-8d1f0b1c2d3e".to_string(),
            opt_out: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["opt-out"], serde_json::Value::Bool(true));
        assert!(json.get("opt_out").is_none());
    }

    #[test]
    fn test_plugin_description_lists_default_to_empty() {
        let desc: PluginDescription = serde_json::from_str(
            r#"{"full_name":"Demo v1.0","version":"1.0","description":null,"website":null}"#,
        )
        .unwrap();
        assert!(desc.authors.is_empty());
        assert!(desc.depend.is_empty());
        assert!(desc.soft_depend.is_empty());
    }
}
