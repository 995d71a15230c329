//! Interactive scan session state machine
//!
//! ```text
//! Idle --start--> Scanning --detect--> Detected --> Resolved | Failed --> Idle
//!                    ^   |
//!                    +---+ duplicate within debounce window
//! ```
//!
//! One session per scanning surface. The debounce memory lives here rather
//! than in any process-wide state and is dropped with the session.
//! Detection stops scanning; the caller restarts it once the outcome is
//! handled, so at most one pipeline run is in flight.

use crate::domain::barcode::BarcodeConfig;
use crate::domain::types::ProductId;
use crate::services::decoder::decode;
use crate::services::order_draft::OrderDraft;
use crate::services::quote::{price_scanned, ScanError, ScanQuote};
use crate::services::resolver::ProductLookup;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default duplicate-suppression window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Detected,
    Resolved,
    Failed,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Scanning => "scanning",
            ScanState::Detected => "detected",
            ScanState::Resolved => "resolved",
            ScanState::Failed => "failed",
        }
    }
}

/// What the scanning surface should do after a detection
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Detection arrived while not scanning
    Ignored,
    /// Same raw string within the debounce window; silent
    DuplicateSuppressed,
    /// Product already in the order: replace that line's weight
    UpdateLine { product_id: ProductId, quote: ScanQuote },
    /// Catalog product not yet in the order: ask before adding
    OfferAdd { quote: ScanQuote },
    /// Decode or resolution failed; show the error
    Failed(ScanError),
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Ignored => "ignored",
            ScanOutcome::DuplicateSuppressed => "duplicate",
            ScanOutcome::UpdateLine { .. } => "update_line",
            ScanOutcome::OfferAdd { .. } => "offer_add",
            ScanOutcome::Failed(e) => e.kind(),
        }
    }

    pub fn quote(&self) -> Option<&ScanQuote> {
        match self {
            ScanOutcome::UpdateLine { quote, .. } | ScanOutcome::OfferAdd { quote } => Some(quote),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct LastScan {
    raw: String,
    at: Instant,
}

pub struct ScanSession {
    id: String,
    state: ScanState,
    debounce: Duration,
    last_scan: Option<LastScan>,
}

impl ScanSession {
    pub fn new(debounce: Duration) -> Self {
        let id = Uuid::now_v7().to_string();
        debug!(session_id = %id, debounce_ms = %debounce.as_millis(), "scan_session_created");
        Self { id, state: ScanState::Idle, debounce, last_scan: None }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Begin scanning; returns false if already scanning
    pub fn start(&mut self) -> bool {
        if self.state == ScanState::Scanning {
            return false;
        }
        self.transition(ScanState::Scanning);
        true
    }

    /// Stop scanning without a detection
    pub fn stop(&mut self) {
        if self.state != ScanState::Idle {
            self.transition(ScanState::Idle);
        }
    }

    /// Whether `raw` at `now` falls inside the debounce window of the last scan
    pub fn is_duplicate(&self, raw: &str, now: Instant) -> bool {
        self.last_scan.as_ref().is_some_and(|last| {
            last.raw == raw && now.saturating_duration_since(last.at) < self.debounce
        })
    }

    /// Handle a raw string emitted by the scan engine
    ///
    /// The code resolves against `catalog` only; a product already in
    /// `order` yields `UpdateLine` for that line.
    pub fn on_detected<C>(
        &mut self,
        raw: &str,
        now: Instant,
        config: &BarcodeConfig,
        order: &OrderDraft,
        catalog: &C,
    ) -> anyhow::Result<ScanOutcome>
    where
        C: ProductLookup + ?Sized,
    {
        let raw = raw.trim();
        if self.state != ScanState::Scanning {
            debug!(session_id = %self.id, state = self.state.as_str(), "scan_ignored");
            return Ok(ScanOutcome::Ignored);
        }
        if self.is_duplicate(raw, now) {
            debug!(session_id = %self.id, raw = %raw, "scan_duplicate_suppressed");
            return Ok(ScanOutcome::DuplicateSuppressed);
        }

        self.last_scan = Some(LastScan { raw: raw.to_string(), at: now });
        self.transition(ScanState::Detected);

        let outcome = match self.run_pipeline(raw, config, order, catalog) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(ScanState::Failed);
                self.transition(ScanState::Idle);
                return Err(e);
            }
        };

        match &outcome {
            ScanOutcome::Failed(e) => {
                warn!(session_id = %self.id, raw = %raw, error = %e, kind = e.kind(), "scan_failed");
                self.transition(ScanState::Failed);
            }
            other => {
                if let Some(quote) = other.quote() {
                    info!(
                        session_id = %self.id,
                        raw = %raw,
                        product_id = %quote.product.id,
                        outcome = other.as_str(),
                        weight = %quote.pricing.display_weight,
                        unit = %quote.pricing.display_unit,
                        total_price = %quote.pricing.total_price,
                        "scan_resolved"
                    );
                }
                self.transition(ScanState::Resolved);
            }
        }
        self.transition(ScanState::Idle);
        Ok(outcome)
    }

    fn run_pipeline<C>(
        &self,
        raw: &str,
        config: &BarcodeConfig,
        order: &OrderDraft,
        catalog: &C,
    ) -> anyhow::Result<ScanOutcome>
    where
        C: ProductLookup + ?Sized,
    {
        let scanned = match decode(raw, config) {
            Ok(scanned) => scanned,
            Err(e) => return Ok(ScanOutcome::Failed(e.into())),
        };

        let quote = match price_scanned(scanned, config, catalog)? {
            Ok(quote) => quote,
            Err(e) => return Ok(ScanOutcome::Failed(e)),
        };
        let product_id = quote.product.id;
        if order.contains(product_id) {
            Ok(ScanOutcome::UpdateLine { product_id, quote })
        } else {
            Ok(ScanOutcome::OfferAdd { quote })
        }
    }

    fn transition(&mut self, next: ScanState) {
        debug!(
            session_id = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "scan_state_transition"
        );
        self.state = next;
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::barcode::ScannedBarcode;
    use crate::domain::types::{Product, WeightUnit};
    use crate::services::resolver::{MatchKind, ProductMatch};

    fn product(id: i64, barcode: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("p{id}"),
            barcode: Some(barcode.to_string()),
            unit: "100g".to_string(),
            price: 10.0,
            price_per_kg: None,
            is_active: true,
        }
    }

    fn config() -> BarcodeConfig {
        BarcodeConfig {
            enabled: true,
            product_code_start: 1,
            product_code_end: 5,
            weight_start: 6,
            weight_end: 10,
            weight_unit: WeightUnit::G,
            weight_divisor: 1,
        }
    }

    fn ordered(products: &[Product]) -> OrderDraft {
        let mut order = OrderDraft::new();
        for p in products {
            let code = p.barcode.clone().unwrap_or_default();
            let scanned = ScannedBarcode {
                raw: format!("{code}00100"),
                product_code: code,
                weight_raw: 100,
            };
            let matched = ProductMatch { product: p.clone(), matched_by: MatchKind::Exact };
            assert!(order.add_line(&ScanQuote::new(scanned, matched, &config())));
        }
        order
    }

    fn scanning() -> ScanSession {
        let mut session = ScanSession::default();
        assert!(session.start());
        session
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = ScanSession::default();
        assert_eq!(session.state(), ScanState::Idle);
        assert_eq!(session.id().len(), 36);
    }

    #[test]
    fn test_detection_while_idle_is_ignored() {
        let mut session = ScanSession::default();
        let catalog = vec![product(1, "12345")];
        let empty = OrderDraft::new();
        let outcome =
            session.on_detected("1234500250", Instant::now(), &config(), &empty, &catalog).unwrap();
        assert_eq!(outcome, ScanOutcome::Ignored);
    }

    #[test]
    fn test_catalog_product_offers_add() {
        let mut session = scanning();
        let catalog = vec![product(1, "12345")];
        let empty = OrderDraft::new();
        let outcome =
            session.on_detected("1234500250", Instant::now(), &config(), &empty, &catalog).unwrap();
        let ScanOutcome::OfferAdd { quote } = outcome else {
            panic!("expected an add offer");
        };
        assert_eq!(quote.product.id, ProductId(1));
        assert_eq!(quote.pricing.total_price, 25.0);
        assert_eq!(session.state(), ScanState::Idle);
    }

    #[test]
    fn test_ordered_product_updates_line() {
        let mut session = scanning();
        let catalog = vec![product(1, "12345"), product(2, "54321")];
        let order = ordered(&catalog[..1]);
        let outcome =
            session.on_detected("1234500250", Instant::now(), &config(), &order, &catalog).unwrap();
        let ScanOutcome::UpdateLine { product_id, quote } = outcome else {
            panic!("expected a line update");
        };
        assert_eq!(product_id, ProductId(1));
        assert_eq!(quote.pricing.total_price, 25.0);
    }

    #[test]
    fn test_exact_catalog_match_beats_weaker_order_match() {
        let mut session = scanning();
        let catalog = vec![product(1, "0058"), product(2, "00058")];
        let order = ordered(&catalog[..1]);
        let outcome =
            session.on_detected("0005800100", Instant::now(), &config(), &order, &catalog).unwrap();
        let ScanOutcome::OfferAdd { quote } = outcome else {
            panic!("expected an add offer for the exact match");
        };
        assert_eq!(quote.product.id, ProductId(2));
    }

    #[test]
    fn test_ordered_product_not_in_catalog_fails() {
        let mut session = scanning();
        let order = ordered(&[product(1, "12345")]);
        let catalog: Vec<Product> = Vec::new();
        let outcome =
            session.on_detected("1234500250", Instant::now(), &config(), &order, &catalog).unwrap();
        assert!(matches!(outcome, ScanOutcome::Failed(ScanError::ProductNotFound { .. })));
    }

    #[test]
    fn test_unknown_product_fails() {
        let mut session = scanning();
        let empty = OrderDraft::new();
        let catalog: Vec<Product> = Vec::new();
        let outcome =
            session.on_detected("5555500100", Instant::now(), &config(), &empty, &catalog).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Failed(ScanError::ProductNotFound {
                product_code: "55555".to_string(),
                weight_raw: 100
            })
        );
        assert_eq!(session.state(), ScanState::Idle);
    }

    #[test]
    fn test_decode_failure_fails() {
        let mut session = scanning();
        let empty = OrderDraft::new();
        let catalog: Vec<Product> = Vec::new();
        let outcome =
            session.on_detected("123", Instant::now(), &config(), &empty, &catalog).unwrap();
        assert_eq!(outcome, ScanOutcome::Failed(ScanError::BarcodeTooShort { required: 10 }));
    }

    #[test]
    fn test_duplicate_within_window_is_suppressed() {
        let mut session = scanning();
        let catalog = vec![product(1, "12345")];
        let empty = OrderDraft::new();
        let t0 = Instant::now();

        let first = session.on_detected("1234500250", t0, &config(), &empty, &catalog).unwrap();
        assert!(matches!(first, ScanOutcome::OfferAdd { .. }));

        session.start();
        let again = session
            .on_detected("1234500250", t0 + Duration::from_millis(4999), &config(), &empty, &catalog)
            .unwrap();
        assert_eq!(again, ScanOutcome::DuplicateSuppressed);
        assert_eq!(session.state(), ScanState::Scanning);

        let later = session
            .on_detected("1234500250", t0 + Duration::from_millis(5000), &config(), &empty, &catalog)
            .unwrap();
        assert!(matches!(later, ScanOutcome::OfferAdd { .. }));
    }

    #[test]
    fn test_different_barcode_is_not_debounced() {
        let mut session = scanning();
        let catalog = vec![product(1, "12345")];
        let empty = OrderDraft::new();
        let t0 = Instant::now();

        session.on_detected("1234500250", t0, &config(), &empty, &catalog).unwrap();
        session.start();
        let other = session
            .on_detected("1234500300", t0 + Duration::from_millis(10), &config(), &empty, &catalog)
            .unwrap();
        assert!(matches!(other, ScanOutcome::OfferAdd { .. }));
    }

    #[test]
    fn test_failed_scans_are_debounced_too() {
        let mut session = scanning();
        let empty = OrderDraft::new();
        let catalog: Vec<Product> = Vec::new();
        let t0 = Instant::now();
        session.on_detected("5555500100", t0, &config(), &empty, &catalog).unwrap();
        session.start();
        let again = session
            .on_detected("5555500100", t0 + Duration::from_secs(1), &config(), &empty, &catalog)
            .unwrap();
        assert_eq!(again, ScanOutcome::DuplicateSuppressed);
    }

    #[test]
    fn test_start_and_stop() {
        let mut session = ScanSession::default();
        assert!(session.start());
        assert!(!session.start());
        session.stop();
        assert_eq!(session.state(), ScanState::Idle);
    }
}
