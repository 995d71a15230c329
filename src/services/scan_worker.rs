//! Scan worker - drives a scan session from a polled scan engine
//!
//! The worker owns one `ScanSession`. Each tick it polls the source; a
//! detected code runs through the session against the current barcode
//! layout, the shared order draft and the catalog. Outcomes that need the
//! operator's attention are sent as `ScanReport`s; duplicates and ignored
//! detections are only counted.

use crate::infra::metrics::Metrics;
use crate::infra::settings::BarcodeSettings;
use crate::io::scan_source::{ScanFrame, ScanSource};
use crate::services::order_draft::OrderDraft;
use crate::services::resolver::ProductLookup;
use crate::services::scan_session::{ScanOutcome, ScanSession};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// A handled scan, ready for the UI or egress
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub session_id: String,
    pub raw: String,
    pub outcome: ScanOutcome,
    pub at: DateTime<Utc>,
}

pub struct ScanWorker<S: ScanSource> {
    source: S,
    session: ScanSession,
    settings: Arc<BarcodeSettings>,
    catalog: Arc<dyn ProductLookup + Send + Sync>,
    order: Arc<Mutex<OrderDraft>>,
    report_tx: mpsc::Sender<ScanReport>,
    metrics: Arc<Metrics>,
    poll_interval: Duration,
}

impl<S: ScanSource> ScanWorker<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        session: ScanSession,
        settings: Arc<BarcodeSettings>,
        catalog: Arc<dyn ProductLookup + Send + Sync>,
        order: Arc<Mutex<OrderDraft>>,
        report_tx: mpsc::Sender<ScanReport>,
        metrics: Arc<Metrics>,
        poll_interval: Duration,
    ) -> Self {
        Self { source, session, settings, catalog, order, report_tx, metrics, poll_interval }
    }

    /// Poll until the source closes or shutdown is signalled
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            session_id = %self.session.id(),
            poll_interval_ms = %self.poll_interval.as_millis(),
            "scan_worker_started"
        );
        self.session.start();

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.source.poll().await {
                        ScanFrame::Code(raw) => {
                            if !self.handle_code(raw).await {
                                break;
                            }
                        }
                        ScanFrame::Empty => {}
                        ScanFrame::Closed => {
                            info!(session_id = %self.session.id(), "scan_source_closed");
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.session.stop();
        info!(session_id = %self.session.id(), "scan_worker_stopped");
    }

    /// Returns false once nobody is listening for reports
    async fn handle_code(&mut self, raw: String) -> bool {
        let config = self.settings.snapshot();
        let started = Instant::now();
        let result = {
            let order = self.order.lock();
            self.session.on_detected(&raw, Instant::now(), &config, &*order, self.catalog.as_ref())
        };
        let latency_us = started.elapsed().as_micros() as u64;

        // detection stops the session; resume for the next scan
        self.session.start();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.record_lookup_error();
                error!(
                    session_id = %self.session.id(),
                    raw = %raw,
                    error = %format!("{e:#}"),
                    "scan_lookup_failed"
                );
                return true;
            }
        };
        self.metrics.record_outcome(&outcome, latency_us);

        if matches!(outcome, ScanOutcome::Ignored | ScanOutcome::DuplicateSuppressed) {
            return true;
        }

        let report = ScanReport {
            session_id: self.session.id().to_string(),
            raw: raw.trim().to_string(),
            outcome,
            at: Utc::now(),
        };
        debug!(outcome = report.outcome.as_str(), latency_us = %latency_us, "scan_report_ready");
        if self.report_tx.send(report).await.is_err() {
            warn!(session_id = %self.session.id(), "scan_report_receiver_dropped");
            return false;
        }
        true
    }
}
