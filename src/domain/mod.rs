//! Domain layer - core types and errors.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod error;
pub mod models;
pub mod settings;

pub use error::{AppError, Result};
pub use models::{
    ActivityReport, BroadcastEvent, DeviceRecord, HookEvent, MainStatus, StatusRecord,
    Transition, DEVICE_ACTIVITY,
};
pub use settings::{AutomationConfig, PluginPaths};
