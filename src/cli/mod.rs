//! CLI interface using clap.
//!
//! Hosts the plugin's `auto-main` command group alongside the host-side
//! commands that drive the record store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Auto Main Status - keep the main AWAKE/SLEEPY status in sync with device activity.
#[derive(Parser, Debug)]
#[command(name = "auto-main-status")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory holding the config file and record store.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configure automatic main status.
    AutoMain {
        #[command(subcommand)]
        action: AutoMainAction,
    },

    /// Create the record store and seed a SLEEPY status record.
    Init,

    /// Manage devices in the record store.
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// Show the current main status.
    Show,

    /// Run the plugin startup check once.
    Check,

    /// Run the plugin, reading device activity as JSON lines from stdin.
    Watch,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoMainAction {
    /// Enable automation.
    Enable,
    /// Disable automation.
    Disable,
    /// Show automation status.
    Status,
}

#[derive(Subcommand, Debug)]
pub enum DeviceAction {
    /// Register a device (or rename a known one).
    Add {
        /// Device ID.
        id: String,

        /// Display name.
        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// Mark a device as in use and report its activity.
    Online {
        /// Device ID.
        id: String,
    },

    /// Mark a device as idle and report its activity.
    Offline {
        /// Device ID.
        id: String,
    },

    /// List known devices.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auto_main_actions() {
        let cli = Cli::try_parse_from(["auto-main-status", "auto-main", "disable"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::AutoMain {
                action: AutoMainAction::Disable
            }
        ));
    }

    #[test]
    fn test_auto_main_requires_action() {
        assert!(Cli::try_parse_from(["auto-main-status", "auto-main"]).is_err());
        assert!(Cli::try_parse_from(["auto-main-status", "auto-main", "toggle"]).is_err());
    }

    #[test]
    fn test_parse_device_online_with_data_dir() {
        let cli = Cli::try_parse_from([
            "auto-main-status",
            "-vv",
            "device",
            "online",
            "lamp",
            "--data-dir",
            "/tmp/hub",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/hub")));
        assert!(matches!(
            cli.command,
            Commands::Device {
                action: DeviceAction::Online { ref id }
            } if id == "lamp"
        ));
    }
}
