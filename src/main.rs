//! Auto Main Status - keep the main AWAKE/SLEEPY status in sync with device activity.
//!
//! The plugin watches `device_activity` hooks, recomputes whether any device
//! is in use and flips the singleton status record (broadcasting
//! `status_changed`) when it no longer matches.
//!
//!   auto-main-status init                     # create store + status record
//!   auto-main-status device add lamp          # register a device
//!   auto-main-status device online lamp       # report activity
//!   auto-main-status auto-main disable        # stop reacting to activity
//!   auto-main-status watch < activity.jsonl   # run the plugin on a stream

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_devices_table, format_event_json, format_main_status, handle_disable, handle_enable,
    handle_status, AutoMainStatusPlugin, HookRegistry, PluginMetadata, RecordStore,
};
use cli::{AutoMainAction, Cli, Commands, DeviceAction};
use domain::{
    ActivityReport, AppError, BroadcastEvent, MainStatus, PluginPaths, DEVICE_ACTIVITY,
};
use infrastructure::{AutomationSwitch, BroadcastEventBus, SqliteRecordStore};

const EVENT_BUS_CAPACITY: usize = 64;

type Plugin = AutoMainStatusPlugin<Arc<SqliteRecordStore>, Arc<BroadcastEventBus>>;

/// The host side: record store, event bus, hook registry and the plugin.
struct Host {
    store: Arc<SqliteRecordStore>,
    bus: Arc<BroadcastEventBus>,
    hooks: HookRegistry,
    plugin: Plugin,
    config_path: PathBuf,
}

impl Host {
    fn open(paths: &PluginPaths) -> domain::Result<Self> {
        let store = Arc::new(SqliteRecordStore::open(&paths.store_db_path())?);
        let bus = Arc::new(BroadcastEventBus::new(EVENT_BUS_CAPACITY));
        let plugin = AutoMainStatusPlugin::new(
            PluginMetadata::default(),
            store.clone(),
            bus.clone(),
            paths.config_file_path(),
        );

        Ok(Self {
            store,
            bus,
            hooks: HookRegistry::new(),
            plugin,
            config_path: paths.config_file_path(),
        })
    }

    /// Register the plugin's hooks without running the startup check.
    fn load_plugin(&mut self) {
        self.plugin.on_load(&mut self.hooks);
    }

    /// Full plugin initialization: hooks plus the startup check.
    fn start_plugin(&mut self) {
        self.plugin.initialize(&mut self.hooks);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let paths = PluginPaths::new(cli.data_dir);
    tracing::debug!(data_dir = %paths.data_dir().display(), "Using data directory");

    // The plugin's own commands only touch the config file.
    if let Commands::AutoMain { action } = cli.command {
        println!("{}", auto_main_message(&paths, action)?);
        return Ok(());
    }

    let mut host = Host::open(&paths)?;

    match cli.command {
        Commands::AutoMain { .. } => {}
        Commands::Init => {
            cmd_init(&host, &paths)?;
        }
        Commands::Device { action } => {
            cmd_device(&mut host, action).await?;
        }
        Commands::Show => {
            cmd_show(&host)?;
        }
        Commands::Check => {
            cmd_check(&mut host).await?;
        }
        Commands::Watch => {
            cmd_watch(&mut host).await?;
        }
    }

    Ok(())
}

/// `auto-main enable|disable|status`, resolved against the config file alone.
fn auto_main_message(paths: &PluginPaths, action: AutoMainAction) -> domain::Result<String> {
    let switch = AutomationSwitch::load(paths.config_file_path());

    match action {
        AutoMainAction::Enable => handle_enable(&switch),
        AutoMainAction::Disable => handle_disable(&switch),
        AutoMainAction::Status => Ok(handle_status(&switch)),
    }
}

/// Create the status record if the store has none.
fn cmd_init(host: &Host, paths: &PluginPaths) -> domain::Result<()> {
    if host.store.seed_status_record(MainStatus::Sleepy)? {
        println!(
            "{} Created status record ({}) in {}",
            "✓".green().bold(),
            MainStatus::Sleepy,
            paths.store_db_path().display()
        );
    } else {
        println!("Status record already present in {}", paths.store_db_path().display());
    }

    Ok(())
}

/// Device management commands.
async fn cmd_device(host: &mut Host, action: DeviceAction) -> domain::Result<()> {
    match action {
        DeviceAction::Add { id, name } => {
            host.store.upsert_device(&id, &name)?;
            println!("{} Registered device {}", "✓".green().bold(), id.cyan());
        }
        DeviceAction::Online { id } => report_device(host, &id, true).await?,
        DeviceAction::Offline { id } => report_device(host, &id, false).await?,
        DeviceAction::List => {
            let devices = host.store.list_devices()?;
            println!("{}", format_devices_table(&devices));
            println!();
            println!("Total: {} device(s)", devices.len());
        }
    }

    Ok(())
}

/// Flip a device's in-use flag, fire `device_activity` and wait for the pass.
async fn report_device(host: &mut Host, id: &str, using: bool) -> domain::Result<()> {
    let mut events = host.bus.subscribe();
    host.load_plugin();

    let report = ActivityReport {
        device: id.to_string(),
        using: Some(using),
        source: Some("cli".to_string()),
    };
    host.store.set_device_using(id, using)?;

    let synchronizer = host.plugin.synchronizer();
    synchronizer.start();
    host.hooks.dispatch(DEVICE_ACTIVITY, &report.to_hook_event());
    synchronizer.settle().await;

    let state = if using { "online".green() } else { "offline".yellow() };
    println!("{} Device {} is {}", "✓".green().bold(), id.cyan(), state);
    if !synchronizer.is_enabled() {
        println!("  Automation is disabled; main status left unchanged");
    }

    print_pending_events(&mut events)
}

/// Show the main status record.
fn cmd_show(host: &Host) -> domain::Result<()> {
    let record = host.store.status_record()?;
    let online = host.store.count_active_devices()?;

    println!("{}", format_main_status(record.as_ref(), online));
    println!(
        "  {}",
        handle_status(&AutomationSwitch::load(host.config_path.clone()))
    );

    Ok(())
}

/// Run the plugin's startup check and report the outcome.
async fn cmd_check(host: &mut Host) -> domain::Result<()> {
    let mut events = host.bus.subscribe();
    let metadata = host.plugin.metadata();
    tracing::info!(plugin = %metadata.name, version = %metadata.version, "Running startup check");

    host.start_plugin();
    host.plugin.synchronizer().settle().await;

    print_pending_events(&mut events)?;
    cmd_show(host)
}

/// Run the plugin until stdin closes.
async fn cmd_watch(host: &mut Host) -> domain::Result<()> {
    let mut events = host.bus.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    host.start_plugin();
    let host = &*host;
    tracing::info!("Watching stdin for device activity");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.map_err(|e| AppError::io("Failed to read stdin", e))? {
                    Some(line) => handle_activity_line(host, &line),
                    None => break,
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event)?,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event printer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    host.plugin.synchronizer().settle().await;
    print_pending_events(&mut events)
}

/// Apply one stdin activity line to the store and fire the hook.
fn handle_activity_line(host: &Host, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let report: ActivityReport = match serde_json::from_str(line) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed activity line");
            return;
        }
    };

    if let Some(using) = report.using {
        if let Err(e) = host.store.set_device_using(&report.device, using) {
            tracing::warn!(device = %report.device, error = %e, "Skipping activity report");
            return;
        }
    }

    host.hooks.dispatch(DEVICE_ACTIVITY, &report.to_hook_event());
}

fn print_event(event: &BroadcastEvent) -> domain::Result<()> {
    println!("{}", format_event_json(event).map_err(AppError::json_parse)?);
    Ok(())
}

/// Print every event already waiting on the receiver.
fn print_pending_events(events: &mut broadcast::Receiver<BroadcastEvent>) -> domain::Result<()> {
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }
    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_auto_main_status_ignores_broken_store() {
        let dir = tempdir().unwrap();
        let paths = PluginPaths::new(Some(dir.path().to_path_buf()));
        std::fs::write(paths.config_file_path(), r#"{"enabled":false}"#).unwrap();
        std::fs::create_dir(paths.store_db_path()).unwrap();

        let message = auto_main_message(&paths, AutoMainAction::Status).unwrap();

        assert_eq!(message, "Automatic Main Status: DISABLED");
        assert!(paths.store_db_path().is_dir());
    }

    #[test]
    fn test_auto_main_toggle_writes_only_config() {
        let dir = tempdir().unwrap();
        let paths = PluginPaths::new(Some(dir.path().to_path_buf()));

        assert_eq!(
            auto_main_message(&paths, AutoMainAction::Disable).unwrap(),
            "Automatic Main Status: DISABLED."
        );
        assert_eq!(
            auto_main_message(&paths, AutoMainAction::Enable).unwrap(),
            "Automatic Main Status: ENABLED."
        );

        assert!(paths.config_file_path().is_file());
        assert!(!paths.store_db_path().exists());
    }
}
