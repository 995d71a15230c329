//! Scan egress - writes handled scans to file
//!
//! Scans are written in JSONL format (one JSON object per line)
//! to the file specified in config.

use crate::services::scan_session::ScanOutcome;
use crate::services::scan_worker::ScanReport;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};

/// One line of the egress file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanRecord<'a> {
    session_id: &'a str,
    ts: String,
    raw: &'a str,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> ScanRecord<'a> {
    fn from_report(report: &'a ScanReport) -> Self {
        let quote = report.outcome.quote();
        let error = match &report.outcome {
            ScanOutcome::Failed(e) => Some(e.to_string()),
            _ => None,
        };
        let product_code = match &report.outcome {
            ScanOutcome::Failed(crate::services::quote::ScanError::ProductNotFound {
                product_code,
                ..
            }) => Some(product_code.as_str()),
            _ => quote.map(|q| q.product_code.as_str()),
        };
        Self {
            session_id: &report.session_id,
            ts: report.at.to_rfc3339(),
            raw: &report.raw,
            outcome: report.outcome.as_str(),
            product_code,
            product_id: quote.map(|q| q.product.id.0),
            weight: quote.map(|q| q.pricing.display_weight),
            unit: quote.map(|q| q.pricing.display_unit.as_str()),
            total_price: quote.map(|q| q.pricing.total_price),
            error,
        }
    }
}

/// Egress writer for scans
pub struct ScanEgress {
    file_path: String,
}

impl ScanEgress {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "egress_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write a scan report to the egress file
    /// Returns true if successful, false otherwise
    pub fn write_report(&self, report: &ScanReport) -> bool {
        let record = ScanRecord::from_report(report);
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                error!(raw = %report.raw, error = %e, "scan_egress_serialize_failed");
                return false;
            }
        };

        match self.append_line(&json) {
            Ok(()) => {
                debug!(
                    session_id = %report.session_id,
                    outcome = %report.outcome.as_str(),
                    "scan_egressed"
                );
                true
            }
            Err(e) => {
                error!(raw = %report.raw, error = %e, "scan_egress_failed");
                false
            }
        }
    }

    /// Append a line to the egress file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
