//! Lock-free scan metrics and periodic reporting
//!
//! Counters are atomics updated on the hot path; `report()` swaps the
//! windowed values to produce a snapshot.
//!
//! NOTE: All atomics use Relaxed ordering. They are statistical counters
//! only and must not drive control flow.

use crate::services::quote::{QuoteResult, ScanError};
use crate::services::scan_session::ScanOutcome;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Quote latency bucket boundaries (microseconds)
/// Buckets: ≤50, ≤100, ≤250, ≤500, ≤1000, ≤2500, ≤5000, ≤10000, >10000
pub const QUOTE_BUCKET_BOUNDS: [u64; 8] = [50, 100, 250, 500, 1000, 2500, 5000, 10000];
pub const QUOTE_NUM_BUCKETS: usize = 9;

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    QUOTE_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Upper bound of the bucket holding the given percentile
fn percentile_from_buckets(buckets: &[u64; QUOTE_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // last bucket reports twice the highest bound
    const BUCKET_UPPER_BOUNDS: [u64; QUOTE_NUM_BUCKETS] =
        [50, 100, 250, 500, 1000, 2500, 5000, 10000, 20000];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[QUOTE_NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Pipeline runs, both call sites (monotonic)
    quotes_total: AtomicU64,
    /// Successfully priced scans (monotonic)
    quotes_priced: AtomicU64,
    config_disabled: AtomicU64,
    barcode_too_short: AtomicU64,
    invalid_weight: AtomicU64,
    product_not_found: AtomicU64,
    /// Catalog transport failures (monotonic)
    lookup_errors: AtomicU64,
    /// Session outcomes (monotonic)
    lines_updated: AtomicU64,
    adds_offered: AtomicU64,
    duplicates_suppressed: AtomicU64,
    /// Accepted admin layout updates (monotonic)
    config_updates: AtomicU64,
    /// Quote latency histogram (reset on report)
    quote_latency_buckets: [AtomicU64; QUOTE_NUM_BUCKETS],
    quote_latency_sum_us: AtomicU64,
    quote_latency_max_us: AtomicU64,
    /// Quote latency histogram for /metrics (monotonic)
    quote_latency_buckets_total: [AtomicU64; QUOTE_NUM_BUCKETS],
    quote_latency_sum_us_total: AtomicU64,
    /// Quotes since last report (reset on report)
    quotes_since_report: AtomicU64,
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            quotes_total: AtomicU64::new(0),
            quotes_priced: AtomicU64::new(0),
            config_disabled: AtomicU64::new(0),
            barcode_too_short: AtomicU64::new(0),
            invalid_weight: AtomicU64::new(0),
            product_not_found: AtomicU64::new(0),
            lookup_errors: AtomicU64::new(0),
            lines_updated: AtomicU64::new(0),
            adds_offered: AtomicU64::new(0),
            duplicates_suppressed: AtomicU64::new(0),
            config_updates: AtomicU64::new(0),
            quote_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            quote_latency_sum_us: AtomicU64::new(0),
            quote_latency_max_us: AtomicU64::new(0),
            quote_latency_buckets_total: std::array::from_fn(|_| AtomicU64::new(0)),
            quote_latency_sum_us_total: AtomicU64::new(0),
            quotes_since_report: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one pipeline run from the HTTP endpoint
    pub fn record_quote(&self, result: &QuoteResult, latency_us: u64) {
        self.record_latency(latency_us);
        match result {
            Ok(_) => {
                self.quotes_priced.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => self.record_scan_error(e),
        }
    }

    /// Record one session outcome
    pub fn record_outcome(&self, outcome: &ScanOutcome, latency_us: u64) {
        match outcome {
            ScanOutcome::Ignored => {}
            ScanOutcome::DuplicateSuppressed => {
                self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
            }
            ScanOutcome::UpdateLine { .. } => {
                self.record_latency(latency_us);
                self.quotes_priced.fetch_add(1, Ordering::Relaxed);
                self.lines_updated.fetch_add(1, Ordering::Relaxed);
            }
            ScanOutcome::OfferAdd { .. } => {
                self.record_latency(latency_us);
                self.quotes_priced.fetch_add(1, Ordering::Relaxed);
                self.adds_offered.fetch_add(1, Ordering::Relaxed);
            }
            ScanOutcome::Failed(e) => {
                self.record_latency(latency_us);
                self.record_scan_error(e);
            }
        }
    }

    pub fn record_lookup_error(&self) {
        self.quotes_total.fetch_add(1, Ordering::Relaxed);
        self.lookup_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_config_update(&self) {
        self.config_updates.fetch_add(1, Ordering::Relaxed);
    }

    fn record_scan_error(&self, error: &ScanError) {
        let counter = match error {
            ScanError::ConfigDisabled => &self.config_disabled,
            ScanError::BarcodeTooShort { .. } => &self.barcode_too_short,
            ScanError::InvalidWeight => &self.invalid_weight,
            ScanError::ProductNotFound { .. } => &self.product_not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency_us: u64) {
        self.quotes_total.fetch_add(1, Ordering::Relaxed);
        self.quotes_since_report.fetch_add(1, Ordering::Relaxed);
        self.quote_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.quote_latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
        let bucket = bucket_index(latency_us);
        self.quote_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.quote_latency_buckets_total[bucket].fetch_add(1, Ordering::Relaxed);
        self.quote_latency_sum_us_total.fetch_add(latency_us, Ordering::Relaxed);
    }

    /// Snapshot without resetting the latency window (for /metrics scrapes)
    pub fn snapshot(&self) -> MetricsSummary {
        let buckets: [u64; QUOTE_NUM_BUCKETS] =
            std::array::from_fn(|i| self.quote_latency_buckets[i].load(Ordering::Relaxed));
        let window = self.quotes_since_report.load(Ordering::Relaxed);
        let sum = self.quote_latency_sum_us.load(Ordering::Relaxed);
        let max = self.quote_latency_max_us.load(Ordering::Relaxed);
        self.summary(buckets, window, sum, max, 0.0)
    }

    /// Snapshot and reset the latency window (for periodic log reports)
    pub fn report(&self) -> MetricsSummary {
        let buckets: [u64; QUOTE_NUM_BUCKETS] =
            std::array::from_fn(|i| self.quote_latency_buckets[i].swap(0, Ordering::Relaxed));
        let window = self.quotes_since_report.swap(0, Ordering::Relaxed);
        let sum = self.quote_latency_sum_us.swap(0, Ordering::Relaxed);
        let max = self.quote_latency_max_us.swap(0, Ordering::Relaxed);

        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed().as_secs_f64();
            *last = Instant::now();
            elapsed
        };
        let per_sec = if elapsed_secs > 0.0 { window as f64 / elapsed_secs } else { 0.0 };
        self.summary(buckets, window, sum, max, per_sec)
    }

    fn summary(
        &self,
        buckets: [u64; QUOTE_NUM_BUCKETS],
        window: u64,
        sum: u64,
        max: u64,
        quotes_per_sec: f64,
    ) -> MetricsSummary {
        MetricsSummary {
            quotes_total: self.quotes_total.load(Ordering::Relaxed),
            quotes_priced: self.quotes_priced.load(Ordering::Relaxed),
            config_disabled: self.config_disabled.load(Ordering::Relaxed),
            barcode_too_short: self.barcode_too_short.load(Ordering::Relaxed),
            invalid_weight: self.invalid_weight.load(Ordering::Relaxed),
            product_not_found: self.product_not_found.load(Ordering::Relaxed),
            lookup_errors: self.lookup_errors.load(Ordering::Relaxed),
            lines_updated: self.lines_updated.load(Ordering::Relaxed),
            adds_offered: self.adds_offered.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
            config_updates: self.config_updates.load(Ordering::Relaxed),
            quotes_in_window: window,
            quotes_per_sec,
            latency_buckets: buckets,
            latency_avg_us: if window > 0 { sum / window } else { 0 },
            latency_max_us: max,
            latency_p50_us: percentile_from_buckets(&buckets, 0.50),
            latency_p99_us: percentile_from_buckets(&buckets, 0.99),
            latency_buckets_total: std::array::from_fn(|i| {
                self.quote_latency_buckets_total[i].load(Ordering::Relaxed)
            }),
            latency_sum_us_total: self.quote_latency_sum_us_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub quotes_total: u64,
    pub quotes_priced: u64,
    pub config_disabled: u64,
    pub barcode_too_short: u64,
    pub invalid_weight: u64,
    pub product_not_found: u64,
    pub lookup_errors: u64,
    pub lines_updated: u64,
    pub adds_offered: u64,
    pub duplicates_suppressed: u64,
    pub config_updates: u64,
    pub quotes_in_window: u64,
    pub quotes_per_sec: f64,
    pub latency_buckets: [u64; QUOTE_NUM_BUCKETS],
    pub latency_avg_us: u64,
    pub latency_max_us: u64,
    pub latency_p50_us: u64,
    pub latency_p99_us: u64,
    /// Since startup; never reset by `report()`
    pub latency_buckets_total: [u64; QUOTE_NUM_BUCKETS],
    pub latency_sum_us_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            quotes_total = %self.quotes_total,
            quotes_priced = %self.quotes_priced,
            quotes_per_sec = %format!("{:.2}", self.quotes_per_sec),
            config_disabled = %self.config_disabled,
            barcode_too_short = %self.barcode_too_short,
            invalid_weight = %self.invalid_weight,
            product_not_found = %self.product_not_found,
            lookup_errors = %self.lookup_errors,
            lines_updated = %self.lines_updated,
            adds_offered = %self.adds_offered,
            duplicates = %self.duplicates_suppressed,
            lat_avg_us = %self.latency_avg_us,
            lat_p99_us = %self.latency_p99_us,
            lat_max_us = %self.latency_max_us,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(50), 0);
        assert_eq!(bucket_index(51), 1);
        assert_eq!(bucket_index(10000), 7);
        assert_eq!(bucket_index(10001), 8);
    }

    #[test]
    fn test_percentile_from_buckets() {
        let mut buckets = [0u64; QUOTE_NUM_BUCKETS];
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 0);

        buckets[0] = 99;
        buckets[8] = 1;
        assert_eq!(percentile_from_buckets(&buckets, 0.50), 50);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 50);
        assert_eq!(percentile_from_buckets(&buckets, 1.0), 20000);
    }

    #[test]
    fn test_record_quote_outcomes() {
        let metrics = Metrics::new();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 10);
        metrics.record_quote(&Err(ScanError::ConfigDisabled), 10);
        metrics.record_lookup_error();

        let summary = metrics.snapshot();
        assert_eq!(summary.quotes_total, 3);
        assert_eq!(summary.invalid_weight, 1);
        assert_eq!(summary.config_disabled, 1);
        assert_eq!(summary.lookup_errors, 1);
        assert_eq!(summary.quotes_priced, 0);
    }

    #[test]
    fn test_record_session_outcomes() {
        let metrics = Metrics::new();
        metrics.record_outcome(&ScanOutcome::DuplicateSuppressed, 0);
        metrics.record_outcome(&ScanOutcome::Ignored, 0);
        metrics.record_outcome(
            &ScanOutcome::Failed(ScanError::ProductNotFound {
                product_code: "1".to_string(),
                weight_raw: 1,
            }),
            120,
        );

        let summary = metrics.snapshot();
        assert_eq!(summary.duplicates_suppressed, 1);
        assert_eq!(summary.product_not_found, 1);
        assert_eq!(summary.quotes_total, 1);
        assert_eq!(summary.latency_max_us, 120);
    }

    #[test]
    fn test_report_resets_window() {
        let metrics = Metrics::new();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 300);
        metrics.record_quote(&Err(ScanError::InvalidWeight), 100);

        let first = metrics.report();
        assert_eq!(first.quotes_in_window, 2);
        assert_eq!(first.latency_avg_us, 200);
        assert_eq!(first.latency_max_us, 300);

        let second = metrics.report();
        assert_eq!(second.quotes_in_window, 0);
        assert_eq!(second.latency_max_us, 0);
        assert_eq!(second.quotes_total, 2);
    }

    #[test]
    fn test_report_keeps_cumulative_histogram() {
        let metrics = Metrics::new();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 300);
        metrics.report();
        metrics.record_quote(&Err(ScanError::InvalidWeight), 40);

        let summary = metrics.snapshot();
        assert_eq!(summary.latency_buckets.iter().sum::<u64>(), 1);
        assert_eq!(summary.latency_buckets_total.iter().sum::<u64>(), 2);
        assert_eq!(summary.latency_buckets_total[0], 1);
        assert_eq!(summary.latency_buckets_total[3], 1);
        assert_eq!(summary.latency_sum_us_total, 340);
    }
}
