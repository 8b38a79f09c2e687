//! # coyote-agent
//!
//! Relay binary: loads settings, serves the pairing WebSocket, bridges game
//! events and paces pulses to the paired device.

#![deny(unsafe_code)]

mod app;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use coyote_settings::{CoyoteSettings, SettingsHandle, SettingsWatcher};

use crate::app::Relay;
use crate::logging::LogFormat;

/// Coyote relay.
#[derive(Parser, Debug)]
#[command(name = "coyote-agent", about = "Pair a DG-LAB Coyote and drive it from game events")]
struct Cli {
    /// Settings file (defaults to `COYOTE_CONFIG` or `coyote.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings, 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Game mod data file or directory (overrides settings).
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Log line format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Do not reload the settings file when it changes.
    #[arg(long)]
    no_watch: bool,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut CoyoteSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref data_file) = self.data_file {
            settings.bridge.data_file = data_file.to_string_lossy().into_owned();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(coyote_settings::settings_path);
    let mut settings = coyote_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply_overrides(&mut settings);

    logging::init_subscriber(logging::default_level(settings.debug), args.log_format);
    tracing::info!(name = %settings.name, version = %settings.version, "starting relay");

    let handle = SettingsHandle::new(settings);
    let _watcher = if args.no_watch || !settings_path.exists() {
        None
    } else {
        match SettingsWatcher::spawn(&settings_path, handle.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e, "settings hot reload disabled");
                None
            }
        }
    };

    let relay = Relay::start(handle).await?;
    tracing::info!(addr = %relay.addr(), "waiting for the app to scan the pairing code");
    tracing::info!(url = %relay.pairing_url(), "pairing code");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    relay.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
