//! Automation config file management.
//!
//! Loads and saves the JSON switch document `{"enabled": <bool>}`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{AppError, AutomationConfig, Result};

/// Load the automation config, falling back to the default.
///
/// A missing, unreadable or malformed file yields `enabled = true`.
#[must_use]
pub fn load_config(path: &Path) -> AutomationConfig {
    if !path.exists() {
        return AutomationConfig::default();
    }

    load_config_from_file(path).unwrap_or_else(|e| {
        tracing::debug!(path = %path.display(), error = %e, "Using default automation config");
        AutomationConfig::default()
    })
}

/// Load the automation config from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AutomationConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    serde_json::from_str(&content).map_err(AppError::json_parse)
}

/// Save the automation config to `path`.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(path: &Path, config: &AutomationConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = serde_json::to_string(config).map_err(AppError::json_parse)?;

    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write config file: {}", path.display()), e))?;

    tracing::info!(path = %path.display(), enabled = config.enabled, "Configuration saved");

    Ok(())
}

/// The automation switch backed by its config file.
///
/// Keeps the value loaded at startup in memory; `get_enabled` re-reads the
/// file so external edits show up in status queries.
pub struct AutomationSwitch {
    path: PathBuf,
    enabled: AtomicBool,
}

impl AutomationSwitch {
    /// Load the switch from `path` (fail-open).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = load_config(&path);
        Self {
            path,
            enabled: AtomicBool::new(config.enabled),
        }
    }

    /// In-memory value.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Current on-disk value.
    pub fn get_enabled(&self) -> bool {
        load_config(&self.path).enabled
    }

    /// Persist the switch, then apply it in memory.
    ///
    /// # Errors
    /// Returns error if the config file cannot be written; the in-memory
    /// value is left unchanged in that case.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        save_config(&self.path, &AutomationConfig { enabled })?;
        self.enabled.store(enabled, Ordering::Release);
        Ok(())
    }
}
