//! Infrastructure layer - external adapters (database, filesystem, bus).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod event_bus;
pub mod sqlite_store;

pub use config::{load_config, save_config, AutomationSwitch};
pub use event_bus::BroadcastEventBus;
pub use sqlite_store::SqliteRecordStore;
