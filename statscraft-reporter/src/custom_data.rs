//! Bounded store for caller-supplied annotations sent with the plugin report.

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::error::ReporterError;

/// Maximum number of custom data entries per plugin
pub const MAX_CUSTOM_DATA_COUNT: usize = 15;
/// Maximum key length, in characters
pub const MAX_CUSTOM_DATA_KEY_LENGTH: usize = 30;
/// Maximum value length after stringification, in characters
pub const MAX_CUSTOM_DATA_VALUE_LENGTH: usize = 100;

/// Custom key/value annotations, ordered by key.
#[derive(Debug, Clone, Default)]
pub struct CustomData {
    entries: BTreeMap<String, String>,
}

impl CustomData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry after checking the bounds.
    ///
    /// Overwriting an existing key is allowed even when the store is full,
    /// since it does not grow the store.
    pub fn insert(&mut self, key: &str, value: impl Display) -> Result<(), ReporterError> {
        if self.entries.len() >= MAX_CUSTOM_DATA_COUNT && !self.entries.contains_key(key) {
            return Err(ReporterError::Validation(format!(
                "Reached the maximum count of custom data ({})",
                MAX_CUSTOM_DATA_COUNT
            )));
        }
        if key.chars().count() > MAX_CUSTOM_DATA_KEY_LENGTH {
            return Err(ReporterError::Validation(format!(
                "The custom data key can't be longer than {} characters",
                MAX_CUSTOM_DATA_KEY_LENGTH
            )));
        }
        let value = value.to_string();
        if value.chars().count() > MAX_CUSTOM_DATA_VALUE_LENGTH {
            return Err(ReporterError::Validation(format!(
                "The custom data value can't be longer than {} characters",
                MAX_CUSTOM_DATA_VALUE_LENGTH
            )));
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Take every entry, leaving the store empty.
    pub fn drain_all(&mut self) -> BTreeMap<String, String> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
