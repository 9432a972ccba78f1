//! Wire documents for the three report kinds.

use statscraft_types::{PluginDescription, ServerSnapshot, UpdateSnapshot};
use std::collections::BTreeMap;

use crate::encoder::JsonDocument;
use crate::host::{detect_os, HostEnvironment};

/// Plugin identity report, sent once by every enabled reporter.
pub fn plugin_report(
    auth_key: &str,
    server_uuid: &str,
    plugin: &PluginDescription,
    custom_data: &BTreeMap<String, String>,
) -> String {
    JsonDocument::with_capacity(512)
        .put("authKey", auth_key)
        .put("serverUuid", server_uuid)
        .put("name", &plugin.full_name)
        .put("version", &plugin.version)
        .put("description", plugin.description.as_deref().unwrap_or_default())
        .put("website", plugin.website.as_deref().unwrap_or_default())
        .put_array("authors", &plugin.authors)
        .put_array("depend", &plugin.depend)
        .put_array("softDepend", &plugin.soft_depend)
        .put_map("customData", custom_data)
        .finish()
}

/// Collect the host snapshot for installation `uuid`.
pub fn capture_server_snapshot(uuid: &str, host: &dyn HostEnvironment) -> ServerSnapshot {
    ServerSnapshot {
        uuid: uuid.to_string(),
        os: detect_os(),
        runtime: host.runtime(),
        server_version: host.server_version(),
        game_version: host.game_version(),
        online_mode: host.online_mode(),
        worlds_count: host.world_count(),
        plugins_count: host.plugin_count(),
        default_game_mode: host.default_game_mode(),
    }
}

/// Host snapshot report, sent once by the leader.
pub fn server_report(snapshot: &ServerSnapshot) -> String {
    JsonDocument::with_capacity(512)
        .put("uuid", &snapshot.uuid)
        .put("osName", &snapshot.os.name)
        .put("osArch", &snapshot.os.arch)
        .put("osVersion", &snapshot.os.version)
        .put("javaVmName", &snapshot.runtime.name)
        .put("javaVendor", &snapshot.runtime.vendor)
        .put("javaVersion", &snapshot.runtime.version)
        .put("coreCount", &snapshot.os.core_count.to_string())
        .put("maxJvmRam", &snapshot.runtime.max_memory.to_string())
        .put("serverVersion", &snapshot.server_version)
        .put("minecraftVersion", &snapshot.game_version)
        .put("onlineMode", &snapshot.online_mode.to_string())
        .put("worldsCount", &snapshot.worlds_count.to_string())
        .put("pluginsCount", &snapshot.plugins_count.to_string())
        .put("defaultGamemode", &snapshot.default_game_mode)
        .finish()
}

/// Recurring update report, sent by the leader on every tick.
pub fn update_report(update: &UpdateSnapshot) -> String {
    JsonDocument::new()
        .put("uuid", &update.uuid)
        .put("playerCount", &update.player_count.to_string())
        .finish()
}
