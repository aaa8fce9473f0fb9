#![cfg(feature = "daemon")]

mod config;
mod layout;
mod screen;
mod server;
mod utils;

use std::path::PathBuf;

use async_std::channel::{Sender, bounded};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook_async_std::Signals;
use tracing::{info, warn};

use config::{DEFAULT_CONFIG_PATH, DaemonConfig};
use screen::OutputSwitcher;
use screen::backend::BackendManager;
use server::server::DaemonServer;

#[derive(Parser)]
#[command(name = "monitoggled", about = "Monitor enable/disable daemon", version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Turns the first termination signal into a shutdown request
async fn forward_signals(mut signals: Signals, shutdown_tx: Sender<()>) {
    if let Some(signal) = signals.next().await {
        info!("Received signal {}", signal);
        let _ = shutdown_tx.send(()).await;
    }
}

#[async_std::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let loaded = DaemonConfig::load(&args.config)?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();

    utils::tracing::setup_tracing(&config.log_path);
    if from_file {
        info!("Configuration loaded from {}", args.config.display());
    } else {
        info!("{} not found, using defaults", args.config.display());
    }
    info!("Starting monitoggled with {:?}", config);

    let backend = BackendManager::new(config.backend).connect()?;
    let mut switcher = OutputSwitcher::new(backend, config.grab_server);

    // The layout at startup is the one to come back to
    match switcher.list_outputs() {
        Ok(outputs) => info!("{} outputs found", outputs.len()),
        Err(e) => warn!("Could not read the initial layout: {}", e),
    }

    let mut daemon_server = DaemonServer::bind(&config.socket_path).await?;

    let signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    let signals_handle = signals.handle();
    let (shutdown_tx, shutdown_rx) = bounded(1);
    let signal_task = async_std::task::spawn(forward_signals(signals, shutdown_tx));

    let result = daemon_server.run(&mut switcher, shutdown_rx).await;

    signals_handle.close();
    signal_task.await;

    if config.restore_on_exit {
        match switcher.restore_all() {
            Ok(restored) if restored.is_empty() => {}
            Ok(restored) => info!("Restored {} before exit", restored.join(", ")),
            Err(e) => warn!("Could not restore outputs before exit: {}", e),
        }
    }

    daemon_server.shutdown();
    result
}
