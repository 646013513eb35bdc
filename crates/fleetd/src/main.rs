//! # fleetd
//!
//! Dispatch gateway server binary — loads settings, starts the WebSocket
//! gateway, and shuts down cleanly on ctrl-c.
//!
//! The gateway hosts the live courier and dashboard channels plus the
//! `/health` endpoint. Proximity search and assignment run in the embedding
//! application through the `fleet-dispatch` library, since their stores are
//! external collaborators.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fleet_server::FleetServer;
use fleet_settings::{load_settings, load_settings_from_path};

/// Fleet dispatch gateway server.
#[derive(Parser, Debug)]
#[command(name = "fleetd", about = "Fleet dispatch gateway server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a settings JSON file (defaults to `~/.fleet/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut settings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => load_settings().context("loading settings")?,
    };
    if let Some(host) = cli.host {
        settings.gateway.host = host;
    }
    if let Some(port) = cli.port {
        settings.gateway.port = port;
    }

    let server = FleetServer::new(settings.gateway);
    let (addr, serve_handle) = server
        .listen()
        .await
        .context("binding gateway listener")?;
    info!(%addr, "fleetd running");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown signal received");
    server
        .shutdown()
        .graceful_shutdown(vec![serve_handle], None)
        .await;

    Ok(())
}
