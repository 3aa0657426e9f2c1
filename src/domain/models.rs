//! Domain models for the main status automation.
//!
//! The status record and device records are owned by the host's record
//! store; this crate only reads devices and rewrites the status singleton.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hook name the host fires whenever a device reports activity.
pub const DEVICE_ACTIVITY: &str = "device_activity";

/// Broadcast event name announcing a main status transition.
pub const STATUS_CHANGED: &str = "status_changed";

/// Two-valued system mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MainStatus {
    /// At least one device is in use.
    Awake = 0,
    /// No device is in use.
    Sleepy = 1,
}

impl MainStatus {
    /// Status implied by the number of devices currently in use.
    #[must_use]
    pub const fn from_online_count(online: usize) -> Self {
        if online > 0 {
            Self::Awake
        } else {
            Self::Sleepy
        }
    }

    /// Integer code stored in the status record and sent on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl From<MainStatus> for i64 {
    fn from(status: MainStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for MainStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Awake),
            1 => Ok(Self::Sleepy),
            other => Err(format!("Unknown main status code: {other}")),
        }
    }
}

impl std::fmt::Display for MainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Awake => write!(f, "AWAKE"),
            Self::Sleepy => write!(f, "SLEEPY"),
        }
    }
}

/// The singleton row holding the current main status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: MainStatus,
    pub last_updated: DateTime<Utc>,
}

impl StatusRecord {
    /// A record carrying `status`, stamped with the current time.
    #[must_use]
    pub fn now(status: MainStatus) -> Self {
        Self {
            status,
            last_updated: Utc::now(),
        }
    }
}

/// A device known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Host-assigned device identifier.
    pub id: String,
    /// Display name (may be empty).
    pub name: String,
    /// Whether the device is currently in use.
    pub using: bool,
    /// Last time the device reported activity.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Metadata passed to hook handlers.
///
/// The payload is opaque to the plugin; `source` is only used for logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl HookEvent {
    /// Event reported by `source` with no extra payload.
    #[must_use]
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            payload: serde_json::Value::Null,
        }
    }
}

/// One line of device activity as reported to `watch` on stdin.
///
/// `{"device": "<id>", "using": <bool>, "source": "<str>"}`; only `device`
/// is required. A missing `using` reports activity without changing the flag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityReport {
    pub device: String,
    #[serde(default)]
    pub using: Option<bool>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ActivityReport {
    /// Hook event carrying this report; the source defaults to the device id.
    #[must_use]
    pub fn to_hook_event(&self) -> HookEvent {
        let source = self.source.as_ref().unwrap_or(&self.device);
        HookEvent {
            payload: serde_json::json!({ "device": self.device, "using": self.using }),
            ..HookEvent::from_source(source.as_str())
        }
    }
}

/// Event handed to the broadcast sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

impl BroadcastEvent {
    /// `status_changed` event with payload `{"status": <code>}`.
    #[must_use]
    pub fn status_changed(status: MainStatus) -> Self {
        Self {
            name: STATUS_CHANGED.to_string(),
            payload: serde_json::json!({ "status": status }),
        }
    }
}

/// Outcome of a reconciliation pass that changed the main status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: MainStatus,
    pub to: MainStatus,
    /// Devices in use when the pass ran.
    pub online: usize,
}
