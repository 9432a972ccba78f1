//! Installation record persistence (`StatsCraft/config.yml`).
//!
//! The file is shared by every reporter on the server. It holds a stable
//! installation `uuid` and the server owner's `opt-out` switch. A missing
//! or damaged file is repaired in place on load.

use serde_yaml::Value;
use statscraft_types::{InstallationRecord, StoredInstallation};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::{CONFIG_FILE_NAME, CONFIG_FOLDER_NAME};

/// Persistence for the installation record, owned by the host.
pub trait InstallationStore: Send + Sync {
    /// Load whatever is currently persisted. Absent storage is an empty record.
    fn load(&self) -> Result<StoredInstallation, String>;

    fn save(&self, record: &InstallationRecord) -> Result<(), String>;
}

/// Load the record, generating and persisting any missing or invalid field.
///
/// Valid fields are kept as they are; the record is written back only when
/// something had to be repaired.
pub fn resolve_installation(store: &dyn InstallationStore) -> InstallationRecord {
    let stored = store.load().unwrap_or_else(|e| {
        log::warn!("[CONFIG] Failed to load installation record: {}", e);
        StoredInstallation::default()
    });

    let mut changed = false;

    let uuid = match stored.uuid.as_deref().map(Uuid::parse_str) {
        Some(Ok(uuid)) => uuid.to_string(),
        Some(Err(_)) => {
            log::warn!("[CONFIG] Invalid installation uuid, generating a new one");
            changed = true;
            Uuid::new_v4().to_string()
        }
        None => {
            changed = true;
            Uuid::new_v4().to_string()
        }
    };

    let opt_out = match stored.opt_out {
        Some(opt_out) => opt_out,
        None => {
            changed = true;
            false
        }
    };

    let record = InstallationRecord { uuid, opt_out };

    if changed {
        if let Err(e) = store.save(&record) {
            log::error!("[CONFIG] Failed to save installation record: {}", e);
        } else {
            log::info!("[CONFIG] Installation record initialised ({})", record.uuid);
        }
    }

    record
}

/// YAML file store.
pub struct YamlInstallationStore {
    path: PathBuf,
}

impl YamlInstallationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store located next to a plugin's data folder:
    /// `<plugins>/MyPlugin` → `<plugins>/StatsCraft/config.yml`.
    pub fn beside_data_folder(data_folder: &Path) -> Self {
        let plugins_dir = data_folder.parent().unwrap_or(data_folder);
        Self::new(plugins_dir.join(CONFIG_FOLDER_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InstallationStore for YamlInstallationStore {
    fn load(&self) -> Result<StoredInstallation, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StoredInstallation::default());
            }
            Err(e) => return Err(format!("Failed to read {}: {}", self.path.display(), e)),
        };
        Ok(parse_stored(&content))
    }

    fn save(&self, record: &InstallationRecord) -> Result<(), String> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        let yaml = serde_yaml::to_string(record)
            .map_err(|e| format!("Failed to serialize installation record: {}", e))?;
        std::fs::write(&self.path, yaml)
            .map_err(|e| format!("Failed to write {}: {}", self.path.display(), e))
    }
}

/// Read the two keys leniently: a field of the wrong type counts as absent,
/// and a document that is not YAML at all counts as empty.
fn parse_stored(content: &str) -> StoredInstallation {
    let doc: Value = match serde_yaml::from_str(content) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("[CONFIG] Malformed installation record, resetting: {}", e);
            return StoredInstallation::default();
        }
    };
    StoredInstallation {
        uuid: doc.get("uuid").and_then(Value::as_str).map(str::to_string),
        opt_out: doc.get("opt-out").and_then(Value::as_bool),
    }
}
