//! Wreckshop — journey service for the artist marketing dashboard.
//!
//! Main entry point: loads configuration, wires the journey engine into the
//! HTTP API and serves until SIGINT/SIGTERM.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wreckshop_api::ApiServer;
use wreckshop_core::config::{AppConfig, LoggingConfig};
use wreckshop_journey::JourneyEngine;

#[derive(Parser, Debug)]
#[command(name = "wreckshop")]
#[command(about = "Marketing-automation journeys for artists and managers")]
#[command(version)]
struct Cli {
    /// Config file (TOML). Missing files are ignored.
    #[arg(long, env = "WRECKSHOP_CONFIG")]
    config: Option<String>,

    /// Bind address (overrides config)
    #[arg(long, env = "WRECKSHOP__API__HOST")]
    host: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "WRECKSHOP__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Seed example journeys on startup
    #[arg(long, default_value_t = false)]
    seed_demo: bool,

    /// Do not start the Prometheus exporter
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(cli.config.as_deref());
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => AppConfig::default(),
    };
    init_tracing(&config.logging);
    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    // Apply CLI overrides
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if cli.seed_demo {
        config.journey.seed_demo = true;
    }
    if cli.no_metrics {
        config.metrics.enabled = false;
    }
    config.validate()?;

    info!(
        service = %config.service_name,
        host = %config.api.host,
        http_port = config.api.http_port,
        prefix = %config.api.path_prefix,
        metrics = config.metrics.enabled,
        "Configuration loaded"
    );

    let engine = Arc::new(JourneyEngine::in_memory(&config.journey));
    if config.journey.seed_demo {
        let seeded = engine.seed_demo_journeys()?;
        info!(count = seeded.len(), "Demo journeys ready");
    }

    let api_server = ApiServer::new(config.clone(), engine);

    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    info!("Wreckshop is ready to serve traffic");

    // Blocks until a shutdown signal arrives
    api_server.start_http(shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
