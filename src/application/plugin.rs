//! Host-facing plugin wrapper around the status synchronizer.
//!
//! Mirrors the host's plugin lifecycle: construct, `on_load` (hook
//! registration), `on_startup` (initial check). The `auto-main` CLI
//! handlers only need the config file, so they work on an
//! [`AutomationSwitch`] and never touch the record store.

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Result, DEVICE_ACTIVITY};
use crate::infrastructure::AutomationSwitch;

use super::formatter::{format_enabled, format_enabled_line};
use super::hooks::HookRegistry;
use super::ports::{EventSink, RecordStore};
use super::synchronizer::{PassTrigger, StatusSynchronizer};

/// Identity of a plugin as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for PluginMetadata {
    fn default() -> Self {
        Self {
            name: "auto_main_status".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Configure automatic main status".to_string(),
        }
    }
}

/// The automatic main status plugin.
pub struct AutoMainStatusPlugin<S, E> {
    metadata: PluginMetadata,
    synchronizer: Arc<StatusSynchronizer<S, E>>,
}

impl<S, E> AutoMainStatusPlugin<S, E>
where
    S: RecordStore + 'static,
    E: EventSink + 'static,
{
    /// Create the plugin; the automation switch is read from `config_path`.
    pub fn new(metadata: PluginMetadata, store: S, sink: E, config_path: impl Into<PathBuf>) -> Self {
        Self {
            metadata,
            synchronizer: StatusSynchronizer::new(store, sink, config_path),
        }
    }

    #[must_use]
    pub const fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    #[must_use]
    pub const fn synchronizer(&self) -> &Arc<StatusSynchronizer<S, E>> {
        &self.synchronizer
    }

    /// Subscribe to device activity.
    pub fn on_load(&self, hooks: &mut HookRegistry) {
        let state = if self.synchronizer.is_enabled() {
            "Enabled"
        } else {
            "Disabled"
        };
        tracing::info!("{} loaded. Automation is {}.", self.metadata.name, state);
        tracing::debug!(description = %self.metadata.description, version = %self.metadata.version);

        hooks.register(DEVICE_ACTIVITY, self.synchronizer.clone());
    }

    /// Start the pass worker and queue the initial check without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_startup(&self) {
        tracing::info!("{} performing initial check...", self.metadata.name);
        self.synchronizer.start();
        self.synchronizer.schedule(PassTrigger::Startup);
    }

    /// Load then start: the full plugin initialization.
    pub fn initialize(&self, hooks: &mut HookRegistry) {
        self.on_load(hooks);
        self.on_startup();
    }
}

/// `auto-main enable`
///
/// # Errors
/// Returns error if the config file cannot be written.
pub fn handle_enable(switch: &AutomationSwitch) -> Result<String> {
    switch.set_enabled(true)?;
    Ok(format!("{}.", format_enabled_line(true)))
}

/// `auto-main disable`
///
/// # Errors
/// Returns error if the config file cannot be written.
pub fn handle_disable(switch: &AutomationSwitch) -> Result<String> {
    switch.set_enabled(false)?;
    Ok(format!("{}.", format_enabled_line(false)))
}

/// `auto-main status`
pub fn handle_status(switch: &AutomationSwitch) -> String {
    let enabled = switch.get_enabled();
    tracing::debug!(state = format_enabled(enabled), "Automation status read");
    format_enabled_line(enabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    use crate::domain::{HookEvent, MainStatus, StatusRecord};
    use crate::infrastructure::{BroadcastEventBus, SqliteRecordStore};

    fn plugin(
        dir: &tempfile::TempDir,
    ) -> (
        AutoMainStatusPlugin<Arc<SqliteRecordStore>, Arc<BroadcastEventBus>>,
        Arc<SqliteRecordStore>,
        Arc<BroadcastEventBus>,
    ) {
        let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        let bus = Arc::new(BroadcastEventBus::new(16));
        let plugin = AutoMainStatusPlugin::new(
            PluginMetadata::default(),
            store.clone(),
            bus.clone(),
            dir.path().join("auto_main_status_config.json"),
        );
        (plugin, store, bus)
    }

    #[test]
    fn test_cli_handlers() {
        let dir = tempdir().unwrap();
        let switch = AutomationSwitch::load(dir.path().join("auto_main_status_config.json"));

        assert_eq!(handle_status(&switch), "Automatic Main Status: ENABLED");
        assert_eq!(
            handle_disable(&switch).unwrap(),
            "Automatic Main Status: DISABLED."
        );
        assert_eq!(handle_status(&switch), "Automatic Main Status: DISABLED");
        assert_eq!(
            handle_enable(&switch).unwrap(),
            "Automatic Main Status: ENABLED."
        );
        assert_eq!(handle_status(&switch), "Automatic Main Status: ENABLED");
    }

    #[tokio::test]
    async fn test_startup_reconciles_against_sqlite() {
        let dir = tempdir().unwrap();
        let (plugin, store, bus) = plugin(&dir);
        store.seed_status_record(MainStatus::Sleepy).unwrap();
        store.upsert_device("lamp", "Desk lamp").unwrap();
        store.set_device_using("lamp", true).unwrap();
        let mut rx = bus.subscribe();

        let mut hooks = HookRegistry::new();
        plugin.initialize(&mut hooks);
        plugin.synchronizer().settle().await;

        let record: StatusRecord = store.status_record().unwrap().unwrap();
        assert_eq!(record.status, MainStatus::Awake);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.payload, serde_json::json!({ "status": 0 }));

        store.set_device_using("lamp", false).unwrap();
        assert_eq!(
            hooks.dispatch(DEVICE_ACTIVITY, &HookEvent::from_source("lamp")),
            1
        );
        plugin.synchronizer().settle().await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.payload, serde_json::json!({ "status": 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_metadata_defaults() {
        let metadata = PluginMetadata::default();
        assert_eq!(metadata.name, "auto_main_status");
        assert!(!metadata.version.is_empty());
    }
}
