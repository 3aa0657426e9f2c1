//! Plugin configuration and on-disk layout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of the automation switch, relative to the data directory.
pub const CONFIG_FILE: &str = "auto_main_status_config.json";

/// File name of the host record store, relative to the data directory.
pub const STORE_FILE: &str = "hub.db";

/// The persisted automation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Whether device activity may change the main status.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

/// Locations of the plugin's files.
#[derive(Debug, Clone)]
pub struct PluginPaths {
    data_dir: PathBuf,
}

impl PluginPaths {
    /// Use `data_dir`, or the default data directory when `None`.
    #[must_use]
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.unwrap_or_else(Self::default_data_dir),
        }
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".auto-main-status")
    }

    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        &self.data_dir
    }

    /// Get the automation config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Get the record store database path.
    #[must_use]
    pub fn store_db_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert!(AutomationConfig::default().enabled);
    }

    #[test]
    fn test_missing_key_means_enabled() {
        let config: AutomationConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn test_paths_under_data_dir() {
        let paths = PluginPaths::new(Some(PathBuf::from("/tmp/hub")));
        assert_eq!(
            paths.config_file_path(),
            PathBuf::from("/tmp/hub/auto_main_status_config.json")
        );
        assert_eq!(paths.store_db_path(), PathBuf::from("/tmp/hub/hub.db"));
    }
}
