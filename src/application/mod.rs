//! Application layer - the plugin and its collaborator ports.
//!
//! This layer contains the status synchronizer and the interfaces it
//! needs from the host (record store, broadcast sink, hook registry).

pub mod formatter;
pub mod hooks;
pub mod plugin;
pub mod ports;
pub mod synchronizer;

pub use formatter::{format_devices_table, format_event_json, format_main_status};
pub use hooks::HookRegistry;
pub use plugin::{
    handle_disable, handle_enable, handle_status, AutoMainStatusPlugin, PluginMetadata,
};
pub use ports::{EventSink, RecordStore};
