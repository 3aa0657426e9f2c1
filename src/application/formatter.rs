//! Output formatting for CLI commands.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{BroadcastEvent, DeviceRecord, MainStatus, StatusRecord};

/// `ENABLED` / `DISABLED`.
#[must_use]
pub const fn format_enabled(enabled: bool) -> &'static str {
    if enabled {
        "ENABLED"
    } else {
        "DISABLED"
    }
}

/// The plugin's status line, e.g. `Automatic Main Status: ENABLED`.
#[must_use]
pub fn format_enabled_line(enabled: bool) -> String {
    format!("Automatic Main Status: {}", format_enabled(enabled))
}

/// Formats the main status record together with the online device count.
pub fn format_main_status(record: Option<&StatusRecord>, online: usize) -> String {
    let Some(record) = record else {
        return format!(
            "{} no status record (run `init` to create one)\n  Devices in use: {}",
            "Main status:".bold(),
            online.to_string().cyan()
        );
    };

    let status = match record.status {
        MainStatus::Awake => record.status.to_string().green(),
        MainStatus::Sleepy => record.status.to_string().blue(),
    };

    format!(
        "{} {}\n  Last updated: {}\n  Devices in use: {}",
        "Main status:".bold(),
        status,
        record.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
        online.to_string().cyan()
    )
}

/// Formats a table listing of devices.
pub fn format_devices_table(devices: &[DeviceRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name", "In use", "Last seen"]);

    for device in devices {
        let last_seen = device.last_seen.map_or_else(
            || "-".to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
        );

        let name = if device.name.is_empty() {
            "-".to_string()
        } else {
            truncate(&device.name, 30)
        };

        table.add_row(vec![
            device.id.as_str(),
            &name,
            if device.using { "yes" } else { "no" },
            &last_seen,
        ]);
    }

    table.to_string()
}

/// Formats a broadcast event as a single JSON line.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_event_json(event: &BroadcastEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("lamp", 10), "lamp");
        assert_eq!(truncate("living room lamp", 10), "living ...");
    }

    #[test]
    fn test_enabled_line() {
        assert_eq!(format_enabled_line(true), "Automatic Main Status: ENABLED");
        assert_eq!(format_enabled_line(false), "Automatic Main Status: DISABLED");
    }

    #[test]
    fn test_devices_table_lists_every_device() {
        let devices = vec![
            DeviceRecord {
                id: "lamp".into(),
                name: "Desk lamp".into(),
                using: true,
                last_seen: None,
            },
            DeviceRecord {
                id: "tv".into(),
                name: String::new(),
                using: false,
                last_seen: None,
            },
        ];

        let table = format_devices_table(&devices);
        assert!(table.contains("Desk lamp"));
        assert!(table.contains("tv"));
        assert!(table.contains("yes"));
    }

    #[test]
    fn test_event_json() {
        let line = format_event_json(&BroadcastEvent::status_changed(MainStatus::Awake)).unwrap();
        assert_eq!(line, r#"{"name":"status_changed","payload":{"status":0}}"#);
    }
}
