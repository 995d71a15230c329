//! Prometheus text exposition of scan metrics
//!
//! Served at /metrics by the HTTP API.

use crate::infra::metrics::{Metrics, MetricsSummary, QUOTE_BUCKET_BOUNDS, QUOTE_NUM_BUCKETS};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; QUOTE_NUM_BUCKETS],
    bounds: &[u64; QUOTE_NUM_BUCKETS - 1],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[QUOTE_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
pub fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let summary = metrics.snapshot();
    let mut output = String::with_capacity(4096);

    write_quote_metrics(&mut output, site_id, &summary);
    write_error_metrics(&mut output, site_id, &summary);
    write_session_metrics(&mut output, site_id, &summary);
    write_latency_metrics(&mut output, site_id, &summary);

    output
}

fn write_quote_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "scale_barcode_quotes_total",
        "Barcodes run through decode, resolve and price",
        MetricType::Counter,
        site,
        summary.quotes_total,
    );
    write_metric(
        output,
        "scale_barcode_quotes_priced_total",
        "Barcodes resolved to a product and priced",
        MetricType::Counter,
        site,
        summary.quotes_priced,
    );
    write_metric(
        output,
        "scale_barcode_config_updates_total",
        "Accepted barcode layout updates",
        MetricType::Counter,
        site,
        summary.config_updates,
    );
}

fn write_error_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    let _ = writeln!(output, "# HELP scale_barcode_errors_total Failed scans by reason");
    let _ = writeln!(output, "# TYPE scale_barcode_errors_total counter");
    let reasons = [
        ("config_disabled", summary.config_disabled),
        ("barcode_too_short", summary.barcode_too_short),
        ("invalid_weight", summary.invalid_weight),
        ("product_not_found", summary.product_not_found),
        ("lookup_error", summary.lookup_errors),
    ];
    for (reason, count) in reasons {
        let _ = writeln!(
            output,
            "scale_barcode_errors_total{{site=\"{site}\",reason=\"{reason}\"}} {count}"
        );
    }
}

fn write_session_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "scale_barcode_lines_updated_total",
        "Rescans that replaced an order line",
        MetricType::Counter,
        site,
        summary.lines_updated,
    );
    write_metric(
        output,
        "scale_barcode_adds_offered_total",
        "Scans that offered a new order line",
        MetricType::Counter,
        site,
        summary.adds_offered,
    );
    write_metric(
        output,
        "scale_barcode_duplicates_suppressed_total",
        "Identical scans dropped inside the debounce window",
        MetricType::Counter,
        site,
        summary.duplicates_suppressed,
    );
}

fn write_latency_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_histogram(
        output,
        "scale_barcode_quote_latency_us",
        "Quote latency in microseconds",
        site,
        &summary.latency_buckets_total,
        &QUOTE_BUCKET_BOUNDS,
        summary.latency_sum_us_total,
    );
    write_metric(
        output,
        "scale_barcode_quote_latency_p99_us",
        "99th percentile quote latency since the last log report",
        MetricType::Gauge,
        site,
        summary.latency_p99_us,
    );
    write_metric(
        output,
        "scale_barcode_quote_latency_max_us",
        "Maximum quote latency since the last log report",
        MetricType::Gauge,
        site,
        summary.latency_max_us,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::quote::ScanError;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 150);
        metrics.record_quote(&Err(ScanError::ConfigDisabled), 250);
        metrics.record_config_update();

        let output = format_prometheus_metrics(&metrics, "deli");

        assert!(output.contains("scale_barcode_quotes_total{site=\"deli\"} 2"));
        assert!(output.contains("scale_barcode_errors_total{site=\"deli\",reason=\"invalid_weight\"} 1"));
        assert!(output.contains("scale_barcode_config_updates_total{site=\"deli\"} 1"));
        assert!(output.contains("scale_barcode_quote_latency_us_bucket{site=\"deli\",le=\"250\"} 2"));
        assert!(output.contains("scale_barcode_quote_latency_us_bucket{site=\"deli\",le=\"+Inf\"} 2"));
    }

    #[test]
    fn test_histogram_survives_periodic_report() {
        let metrics = Metrics::new();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 150);
        metrics.record_quote(&Err(ScanError::InvalidWeight), 20000);
        metrics.report();

        let output = format_prometheus_metrics(&metrics, "deli");

        assert!(output.contains("scale_barcode_quote_latency_us_bucket{site=\"deli\",le=\"250\"} 1"));
        assert!(output.contains("scale_barcode_quote_latency_us_bucket{site=\"deli\",le=\"+Inf\"} 2"));
        assert!(output.contains("scale_barcode_quote_latency_us_sum{site=\"deli\"} 20150"));
        assert!(output.contains("scale_barcode_quote_latency_us_count{site=\"deli\"} 2"));
    }
}
