//! Console settings

use std::path::{Path, PathBuf};

use bus_live::LiveConfig;
use bus_monitor::{DefinitionCatalog, FrameId, MonitorConfig, ParseFrameIdError};
use bus_sim::VirtualBusConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reading or writing the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Neither `XDG_CONFIG_HOME` nor a home directory is available
    #[error("could not determine settings path")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings JSON
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    /// A catalog entry has an unparsable identifier
    #[error("catalog entry {id:?}: {source}")]
    CatalogEntry {
        /// Identifier text as written
        id: String,
        /// Parse failure
        source: ParseFrameIdError,
    },
}

/// Message name entry, keyed by `source:ADDRESS` text (e.g. `"0:1A0"`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    /// Identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Expected payload length
    pub size: usize,
}

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Engine configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Actor configuration
    #[serde(default)]
    pub live: LiveConfig,
    /// Simulated bus
    #[serde(default)]
    pub bus: VirtualBusConfig,
    /// Simulation step in milliseconds
    #[serde(default = "default_sim_tick_ms")]
    pub sim_tick_ms: u64,
    /// Table print interval in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    /// Maximum rows printed per table
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Use simulated node names as definitions
    #[serde(default = "default_true")]
    pub use_sim_names: bool,
    /// Extra definitions; these win over simulated node names
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

fn default_sim_tick_ms() -> u64 {
    10
}

fn default_refresh_ms() -> u64 {
    1000
}

fn default_max_rows() -> usize {
    40
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            live: LiveConfig::default(),
            bus: VirtualBusConfig::default(),
            sim_tick_ms: default_sim_tick_ms(),
            refresh_ms: default_refresh_ms(),
            max_rows: default_max_rows(),
            use_sim_names: true,
            catalog: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for busview
    /// Uses $XDG_CONFIG_HOME/busview, falls back to ~/.config/busview
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("busview"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("busview"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Add the configured catalog entries to `catalog`
    pub fn extend_catalog(&self, catalog: &mut DefinitionCatalog) -> Result<(), SettingsError> {
        for entry in &self.catalog {
            let id: FrameId = entry
                .id
                .parse()
                .map_err(|source| SettingsError::CatalogEntry {
                    id: entry.id.clone(),
                    source,
                })?;
            catalog.insert(id, entry.name.clone(), entry.size);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bus_monitor::DefinitionProvider;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("busview-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "refresh_ms": 250 }"#).unwrap();
        assert_eq!(settings.refresh_ms, 250);
        assert_eq!(settings.max_rows, 40);
        assert_eq!(settings.monitor, MonitorConfig::default());
        assert!(settings.use_sim_names);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip/settings.json");
        let settings = Settings {
            max_rows: 7,
            catalog: vec![CatalogEntry {
                id: "0:1A0".into(),
                name: "BRAKE".into(),
                size: 2,
            }],
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = temp_path("does-not-exist.json");
        assert!(matches!(
            Settings::load_from(&path),
            Err(SettingsError::Io(_))
        ));
    }

    #[test]
    fn test_catalog_entries() {
        let mut settings = Settings::default();
        settings.catalog.push(CatalogEntry {
            id: "1:7DF".into(),
            name: "OBD_REQUEST".into(),
            size: 8,
        });

        let mut catalog = DefinitionCatalog::new();
        settings.extend_catalog(&mut catalog).unwrap();
        let def = catalog.definition(FrameId::new(1, 0x7DF)).unwrap();
        assert_eq!(def.name, "OBD_REQUEST");

        settings.catalog.push(CatalogEntry {
            id: "bogus".into(),
            name: "X".into(),
            size: 1,
        });
        assert!(matches!(
            settings.extend_catalog(&mut catalog),
            Err(SettingsError::CatalogEntry { .. })
        ));
    }
}
