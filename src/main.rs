//! Scale barcode service
//!
//! Decodes barcodes printed by weighing scales, resolves the product and
//! prices the weighed quantity. Serves the barcode layout and the parse
//! endpoint over HTTP.
//!
//! Module structure:
//! - `domain/` - Core types (BarcodeConfig, Product, WeightUnit)
//! - `io/` - External interfaces (HTTP API, Catalog, Scan source, Egress)
//! - `services/` - Business logic (Decoder, Resolver, Pricing, Scan session)
//! - `infra/` - Infrastructure (Config, Settings store, Metrics)

use clap::Parser;
use scale_barcode::infra::{BarcodeSettings, Config, Metrics};
use scale_barcode::io::{start_api_server, ApiState, Catalog};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Scale barcode service - weighed-item barcode decoding and pricing
#[derive(Parser, Debug)]
#[command(name = "scale-barcode", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug for per-scan visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "scale-barcode starting");

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path)?;

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        bind = %format!("{}:{}", config.bind_address(), config.port()),
        catalog = %config.catalog_file(),
        settings_file = ?config.settings_file(),
        barcode_enabled = %config.barcode().enabled,
        "config_loaded"
    );

    let settings =
        Arc::new(BarcodeSettings::load(config.barcode().clone(), config.settings_file())?);
    let catalog = Arc::new(Catalog::from_file(config.catalog_file())?);
    let metrics = Arc::new(Metrics::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Periodic metrics log
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_address(), config.port()).parse()?;
    let state = Arc::new(ApiState {
        settings,
        catalog,
        metrics: metrics.clone(),
        site_id: config.site_id().to_string(),
    });

    if let Err(e) = start_api_server(addr, state, shutdown_rx).await {
        error!(error = %e, "api_server_error");
        return Err(anyhow::anyhow!(e));
    }

    metrics.report().log();
    info!("scale-barcode shutdown complete");
    Ok(())
}
