// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use remnadns::{
    config::{AppConfig, LogLevel},
    constants::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH, ENV_LOG_FORMAT},
    inventory::RemnawaveClient,
    metrics_server,
    provider::cloudflare::CloudflareClient,
    reconcilers::Reconciler,
    scheduler::{run_with_startup, IntervalTicker},
    zones::ZoneCache,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Keep Cloudflare address records in sync with Remnawave node health
#[derive(Debug, Parser)]
#[command(name = "remnadns", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = ENV_CONFIG_PATH, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging(LogLevel::default());
            error!(path = %args.config.display(), error = %e, "Failed to load configuration");
            return Err(e).context("configuration is invalid");
        }
    };
    init_logging(config.log_level);

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("remnadns")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// Initialize logging.
///
/// `RUST_LOG` takes precedence over the configured level. `RUST_LOG_FORMAT=json`
/// selects JSON output, anything else the compact text format.
fn init_logging(level: LogLevel) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));

    let log_format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: AppConfig) -> Result<()> {
    info!(
        zones = config.zones.len(),
        check_interval_secs = config.check_interval.as_secs(),
        "Starting remnadns"
    );
    debug!(remnawave = ?config.remnawave, cloudflare = ?config.cloudflare, "Collaborator endpoints");

    let health = Arc::new(
        RemnawaveClient::new(&config.remnawave).context("failed to create Remnawave client")?,
    );
    let provider = Arc::new(
        CloudflareClient::new(&config.cloudflare).context("failed to create Cloudflare client")?,
    );

    let (stop, shutdown) = watch::channel(false);

    let metrics_task = config.metrics_addr.map(|addr| {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics_server::serve(addr, shutdown).await {
                error!(addr = %addr, error = %e, "Metrics server failed");
            }
        })
    });

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop.send(true);
    });

    let mut reconciler = Reconciler::new(health, provider, config.zones, ZoneCache::default());
    let mut ticker = IntervalTicker::new(config.check_interval);
    run_with_startup(&mut reconciler, &mut ticker, shutdown)
        .await
        .context("reconciler failed to start")?;

    if let Some(task) = metrics_task {
        let _ = task.await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
