//! CLI commands: drive a consent session against the file-backed store.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use parking_lot::Mutex;
use tracing::info;

use mowforce_consent::{
    ConsentManager, ConsentModeAdapter, ConsentStore, DataLayerSink, FileStorage, UiHooks,
};
use mowforce_core::ConsentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Status,
    Accept,
    Decline,
    Custom { analytics: bool, advertising: bool },
    Reset,
    Help,
}

impl Command {
    /// Parse the positional arguments left after global flags.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Self::Status);
        };
        match name.as_str() {
            "status" => Ok(Self::Status),
            "accept" => Ok(Self::Accept),
            "decline" => Ok(Self::Decline),
            "custom" => {
                if args.len() != 3 {
                    bail!("Usage: mowforce-consent custom <analytics> <advertising>");
                }
                Ok(Self::Custom {
                    analytics: parse_flag(&args[1])?,
                    advertising: parse_flag(&args[2])?,
                })
            }
            "reset" => Ok(Self::Reset),
            "help" | "--help" | "-h" => Ok(Self::Help),
            other => Err(anyhow!(
                "Unknown command: {}. Use 'mowforce-consent help' for usage.",
                other
            )),
        }
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Expected true or false, got {:?}", raw),
    }
}

/// Terminal stand-in for the page: logs banner/modal changes and remembers reload requests.
#[derive(Default)]
pub struct TerminalUi {
    reload_requested: Mutex<bool>,
}

impl TerminalUi {
    pub fn reload_requested(&self) -> bool {
        *self.reload_requested.lock()
    }
}

impl UiHooks for TerminalUi {
    fn show_banner(&self) {
        info!("[ui] consent banner shown");
    }
    fn hide_banner(&self) {
        info!("[ui] consent banner hidden");
    }
    fn open_modal(&self) {
        info!("[ui] settings modal opened");
    }
    fn close_modal(&self) {
        info!("[ui] settings modal closed");
    }
    fn reload_page(&self) {
        info!("[ui] page reload requested");
        *self.reload_requested.lock() = true;
    }
}

fn open_session(
    config: &ConsentConfig,
    sink: Arc<DataLayerSink>,
    ui: Arc<TerminalUi>,
) -> ConsentManager {
    let storage = Arc::new(FileStorage::open(&config.storage_path));
    let manager = ConsentManager::new(ConsentStore::new(storage), config)
        .with_adapter(ConsentModeAdapter::new(sink))
        .with_ui(ui);
    manager.initialize();
    manager
}

/// Run one command and return the resulting report.
pub fn run(command: Command, config: &ConsentConfig) -> anyhow::Result<serde_json::Value> {
    let sink = Arc::new(DataLayerSink::new());
    let ui = Arc::new(TerminalUi::default());
    let mut manager = open_session(config, sink.clone(), ui.clone());

    match command {
        Command::Status => {}
        Command::Accept => {
            manager.accept_all();
        }
        Command::Decline => {
            manager.decline_all();
        }
        Command::Custom {
            analytics,
            advertising,
        } => {
            manager.open_settings();
            manager.save_custom_settings(analytics, advertising);
        }
        Command::Reset => manager.reset(),
        Command::Help => bail!("help is handled before a session is opened"),
    }

    if ui.reload_requested() {
        manager = open_session(config, sink.clone(), Arc::new(TerminalUi::default()));
    }

    let data_layer: Vec<serde_json::Value> = sink.entries().iter().map(|e| e.to_json()).collect();
    Ok(serde_json::json!({
        "status": manager.get_status(),
        "visibility": manager.visibility(),
        "expiryDays": config.expiry_days,
        "store": config.storage_path.display().to_string(),
        "dataLayer": data_layer,
    }))
}

pub fn print_help() {
    println!("mowforce-consent: inspect and change stored consent");
    println!();
    println!("Usage: mowforce-consent [--store <path>] [--config <path>] [command]");
    println!();
    println!("Commands:");
    println!("  status                     Show the stored decision (default)");
    println!("  accept                     Accept all categories");
    println!("  decline                    Decline all optional categories");
    println!("  custom <analytics> <ads>   Save custom settings (true|false each)");
    println!("  reset                      Forget the stored decision");
    println!("  help                       Show this help message");
}
