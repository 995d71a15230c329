//! Scan station
//!
//! Reads a keyboard-wedge scanner (one barcode per line on stdin) and
//! builds an order draft from weighed-item labels. Rescanning an ordered
//! product replaces its weight; new products are added only with
//! `--add-new`, otherwise the offer is logged and skipped.
//!
//! Usage:
//!   cargo run --bin scan-station -- --config config/dev.toml --add-new

use clap::Parser;
use parking_lot::Mutex;
use scale_barcode::infra::{BarcodeSettings, Config, Metrics};
use scale_barcode::io::{Catalog, LineSource, ScanEgress};
use scale_barcode::services::{OrderDraft, ScanOutcome, ScanReport, ScanSession, ScanWorker};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scan-station")]
#[command(about = "Build an order from weighed-item barcodes read on stdin")]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Confirm every add offer automatically
    #[arg(long)]
    add_new: bool,

    /// Append scan reports to the configured egress file
    #[arg(long)]
    egress: bool,
}

fn apply_report(order: &Mutex<OrderDraft>, report: &ScanReport, add_new: bool) {
    match &report.outcome {
        ScanOutcome::UpdateLine { product_id, quote } => {
            order.lock().update_line(*product_id, quote);
        }
        ScanOutcome::OfferAdd { quote } => {
            if add_new {
                order.lock().add_line(quote);
            } else {
                info!(
                    product_id = %quote.product.id,
                    name = %quote.product.name,
                    weight = %quote.pricing.display_weight,
                    unit = %quote.pricing.display_unit,
                    total_price = %quote.pricing.total_price,
                    "scan_add_offered"
                );
            }
        }
        ScanOutcome::Failed(e) => {
            warn!(raw = %report.raw, error = %e, "scan_rejected");
        }
        ScanOutcome::Ignored | ScanOutcome::DuplicateSuppressed => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path)?;

    let settings =
        Arc::new(BarcodeSettings::load(config.barcode().clone(), config.settings_file())?);
    let catalog = Arc::new(Catalog::from_file(config.catalog_file())?);
    let metrics = Arc::new(Metrics::new());
    let order = Arc::new(Mutex::new(OrderDraft::new()));
    let egress = args.egress.then(|| ScanEgress::new(config.egress_file()));

    let (report_tx, mut report_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = ScanWorker::new(
        LineSource::spawn(tokio::io::stdin(), 64),
        ScanSession::new(config.debounce()),
        settings,
        catalog,
        order.clone(),
        report_tx,
        metrics.clone(),
        config.poll_interval(),
    );
    tokio::spawn(worker.run(shutdown_rx));

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    info!(add_new = %args.add_new, "scan_station_ready");

    while let Some(report) = report_rx.recv().await {
        apply_report(&order, &report, args.add_new);
        if let Some(egress) = &egress {
            egress.write_report(&report);
        }
    }

    let order = order.lock();
    for line in order.lines() {
        info!(
            product_id = %line.product.id,
            name = %line.product.name,
            weight = %line.weight,
            unit = %line.unit,
            total_price = %line.total_price,
            "order_line"
        );
    }
    info!(lines = %order.lines().len(), total = %order.total(), "order_summary");
    metrics.report().log();
    Ok(())
}
