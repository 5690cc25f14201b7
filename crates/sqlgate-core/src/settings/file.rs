//! Settings file loading

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::ConnectionSettings;
use crate::{Result, SqlgateError};

fn default_pool_size() -> i64 {
    3
}

/// One named section of a settings file
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsSection {
    #[serde(flatten)]
    pub settings: ConnectionSettings,

    /// Requested pool size; clamped by the pool, not here
    #[serde(default = "default_pool_size", alias = "POOLNUM")]
    pub pool_size: i64,
}

/// A TOML settings file holding one table per database section
///
/// ```toml
/// [primary]
/// host = "127.0.0.1"
/// user = "app"
/// password = "secret"
/// database = "orders"
/// pool_size = 8
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    sections: BTreeMap<String, SettingsSection>,
}

impl SettingsFile {
    /// Read and parse a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SqlgateError::Configuration(format!(
                "failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file = Self::parse(&text)?;
        tracing::debug!(
            path = %path.display(),
            sections = file.sections.len(),
            "loaded settings file"
        );
        Ok(file)
    }

    /// Parse settings from TOML text
    pub fn parse(text: &str) -> Result<Self> {
        let sections: BTreeMap<String, SettingsSection> = toml::from_str(text)?;
        Ok(Self { sections })
    }

    /// Look up and validate a section by name
    pub fn section(&self, name: &str) -> Result<&SettingsSection> {
        let section = self.sections.get(name).ok_or_else(|| {
            SqlgateError::Configuration(format!("settings section '{}' not found", name))
        })?;
        section.settings.validate()?;
        Ok(section)
    }

    /// Names of all sections, sorted
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}
