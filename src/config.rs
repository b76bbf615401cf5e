// Configuration loaded from config.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::form::{Roster, default_classes};
use crate::storage::Backend;

pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const DEFAULT_STORAGE_KEY: &str = "sdn_bangsal_absensi";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Storage backend for the record collection
    pub backend: Backend,

    /// Key the whole collection is stored under
    pub storage_key: String,

    /// Pause before a submitted report is committed; 0 disables it
    pub submit_delay_ms: u64,

    /// Where exports are written
    pub export_dir: PathBuf,

    /// Classes a report may name
    pub classes: Vec<String>,

    /// Students a report may name; empty accepts any name
    pub students: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            submit_delay_ms: 800,
            export_dir: PathBuf::from("."),
            classes: default_classes(),
            students: Vec::new(),
        }
    }
}

impl Config {
    /// Load from the store directory, then the user config directory, then defaults
    pub fn load(store_dir: &Path) -> Result<Self> {
        Self::load_with_fallback(store_dir, user_config_path().as_deref())
    }

    pub fn load_with_fallback(store_dir: &Path, user_path: Option<&Path>) -> Result<Self> {
        let local = store_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load_from(&local);
        }

        if let Some(path) = user_path.filter(|p| p.exists()) {
            return Self::load_from(path);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config {:?}", path))?;
        debug!(path = ?path, backend = ?config.backend, "Loaded config");
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    pub fn roster(&self) -> Roster {
        Roster {
            classes: self.classes.clone(),
            students: self.students.clone(),
        }
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }
}

/// Get the user-level config file path (~/.config/absensi/config.yml)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("absensi").join(CONFIG_FILE_NAME))
}
