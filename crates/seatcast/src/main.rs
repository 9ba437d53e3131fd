//! # seatcast
//!
//! seatcast server binary: loads settings, binds the configured delivery
//! strategy and serves the WebSocket and notify endpoints until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use seatcast_core::logging::init_subscriber;
use seatcast_server::config::ServerConfig;
use seatcast_server::{DispatchContext, HttpServer, StrategySelection};
use seatcast_settings::{SeatcastSettings, load_settings, load_settings_from_path, settings_path};

/// How long to wait for background tasks once the server has stopped.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Real-time course seat notifications over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "seatcast", about = "Real-time course seat notification server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Delivery strategy key: `broadcast` or `observer` (overrides settings).
    #[arg(long)]
    strategy: Option<String>,

    /// Maximum concurrent WebSocket connections (overrides settings).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level filter, e.g. `debug` (overrides settings; `RUST_LOG` wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file (default `~/.seatcast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags take precedence over file and environment.
    fn apply(&self, settings: &mut SeatcastSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref strategy) = self.strategy {
            settings.dispatch.strategy.clone_from(strategy);
        }
        if let Some(max) = self.max_connections {
            settings.server.max_connections = max;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = match args.settings {
        Some(ref path) => load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => load_settings().with_context(|| {
            format!("Failed to load settings from {}", settings_path().display())
        })?,
    };
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    init_subscriber(&settings.logging.level);

    let metrics =
        seatcast_server::metrics::install_recorder().context("Failed to install metrics")?;
    let server = Arc::new(
        HttpServer::new(ServerConfig::from(&settings.server)).with_metrics(metrics),
    );

    let dispatch = Arc::new(DispatchContext::new(StrategySelection::builtin(
        settings.dispatch.strategy.clone(),
    )));
    dispatch
        .init(server.as_ref())
        .context("Failed to initialize dispatch context")?;

    let signal = {
        let server = server.clone();
        tokio::spawn(async move { server.shutdown().wait_for_signal().await })
    };

    server.serve(dispatch).await.context("Server error")?;
    server
        .shutdown()
        .graceful_shutdown(vec![signal], Some(SHUTDOWN_TIMEOUT))
        .await;
    tracing::info!("seatcast stopped");
    Ok(())
}
