//! Courier desk - booking and tracking API server
//!
//! Module structure:
//! - `domain/` - Core business types (bookings, tracking records, service catalog)
//! - `io/` - External interfaces (HTTP server and client, booking store)
//! - `services/` - Business logic (booking wizard, booking creation, tracking lookup)
//! - `infra/` - Infrastructure (Config, Logging, Metrics)

use anyhow::Context;
use clap::Parser;
use courier_desk::infra::{init_logging, Config, Metrics, StoreBackend};
use courier_desk::io::{start_http_server, ApiState, BookingStore, JsonlStore, MemoryStore};
use courier_desk::services::{BookingService, FixtureLookup};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Courier desk - shipment booking and tracking API
#[derive(Parser, Debug)]
#[command(name = "courier-desk", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn BookingStore>> {
    Ok(match config.store_backend() {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Jsonl => Arc::new(
            JsonlStore::open(config.store_file())
                .with_context(|| format!("Failed to open booking store {}", config.store_file()))?,
        ),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    init_logging(config.log_format());
    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "courier-desk starting");

    let store_backend = match config.store_backend() {
        StoreBackend::Memory => "memory",
        StoreBackend::Jsonl => "jsonl",
    };
    info!(
        config_file = %config.config_file(),
        bind_address = %config.bind_address(),
        port = %config.port(),
        max_body_bytes = %config.max_body_bytes(),
        store_backend = %store_backend,
        store_file = %config.store_file(),
        required_fields = ?config.required_fields(),
        tracking_latency_ms = %config.tracking_latency_ms(),
        "config_loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());

    let store = open_store(&config)?;
    info!(bookings = %store.len(), "store_opened");

    let bookings = BookingService::new(store, metrics.clone())
        .with_required_fields(config.required_fields().to_vec());
    let tracking = Arc::new(
        FixtureLookup::sample(Duration::from_millis(config.tracking_latency_ms()))
            .with_metrics(metrics.clone()),
    );
    let state = Arc::new(ApiState::new(bookings, tracking, metrics.clone(), config.max_body_bytes()));

    // Periodic metrics reporter
    let metrics_interval = config.metrics_interval_secs().max(1);
    let reporter_metrics = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            reporter_metrics.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port())
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address(), config.port()))?;

    if let Err(e) = start_http_server(addr, state, shutdown_rx).await {
        error!(error = %e, "http_server_error");
        anyhow::bail!("http server failed: {e}");
    }

    info!("courier-desk shutdown complete");
    Ok(())
}
