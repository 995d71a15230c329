//! Decode → resolve → price, shared by the HTTP endpoint and scan sessions
//!
//! Business outcomes come back as `ScanError`; only lookup transport
//! failures surface through the outer `anyhow::Result`.

use crate::domain::barcode::{BarcodeConfig, ScannedBarcode};
use crate::domain::types::Product;
use crate::services::decoder::{decode, DecodeError};
use crate::services::pricing::{compute_price, PricingResult};
use crate::services::resolver::{resolve, MatchKind, ProductLookup, ProductMatch};
use tracing::debug;

/// Terminal outcome of a failed decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    ConfigDisabled,
    BarcodeTooShort { required: usize },
    InvalidWeight,
    ProductNotFound { product_code: String, weight_raw: u64 },
}

impl ScanError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::ConfigDisabled => "config_disabled",
            ScanError::BarcodeTooShort { .. } => "barcode_too_short",
            ScanError::InvalidWeight => "invalid_weight",
            ScanError::ProductNotFound { .. } => "product_not_found",
        }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::ConfigDisabled => write!(f, "Barcode system is disabled"),
            ScanError::BarcodeTooShort { required } => {
                write!(f, "Barcode too short. Expected at least {required} digits")
            }
            ScanError::InvalidWeight => write!(f, "Invalid weight in barcode"),
            ScanError::ProductNotFound { .. } => write!(f, "Product not found for barcode"),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<DecodeError> for ScanError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::ConfigDisabled => ScanError::ConfigDisabled,
            DecodeError::BarcodeTooShort { required, .. } => ScanError::BarcodeTooShort { required },
            DecodeError::InvalidWeight { .. } => ScanError::InvalidWeight,
        }
    }
}

/// A fully priced scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanQuote {
    pub raw: String,
    pub product_code: String,
    pub weight_raw: u64,
    pub product: Product,
    pub matched_by: MatchKind,
    pub pricing: PricingResult,
}

impl ScanQuote {
    /// Price an already resolved scan
    pub fn new(scanned: ScannedBarcode, matched: ProductMatch, config: &BarcodeConfig) -> Self {
        let pricing = compute_price(&matched.product, scanned.weight_raw, config);
        Self {
            raw: scanned.raw,
            product_code: scanned.product_code,
            weight_raw: scanned.weight_raw,
            product: matched.product,
            matched_by: matched.matched_by,
            pricing,
        }
    }
}

/// Outcome of one pipeline run
pub type QuoteResult = Result<ScanQuote, ScanError>;

/// Decode `raw`, resolve it against `lookup` and price it
///
/// Surrounding whitespace (scanner line terminators) is ignored.
pub fn decode_and_price<L>(
    raw: &str,
    config: &BarcodeConfig,
    lookup: &L,
) -> anyhow::Result<QuoteResult>
where
    L: ProductLookup + ?Sized,
{
    let scanned = match decode(raw.trim(), config) {
        Ok(scanned) => scanned,
        Err(e) => {
            debug!(raw = %raw, error = %e, "barcode_decode_failed");
            return Ok(Err(e.into()));
        }
    };
    price_scanned(scanned, config, lookup)
}

/// Resolve and price an already decoded scan
pub fn price_scanned<L>(
    scanned: ScannedBarcode,
    config: &BarcodeConfig,
    lookup: &L,
) -> anyhow::Result<QuoteResult>
where
    L: ProductLookup + ?Sized,
{
    let Some(matched) = resolve(&scanned.product_code, lookup)? else {
        return Ok(Err(ScanError::ProductNotFound {
            product_code: scanned.product_code,
            weight_raw: scanned.weight_raw,
        }));
    };

    let quote = ScanQuote::new(scanned, matched, config);
    debug!(
        raw = %quote.raw,
        product_id = %quote.product.id,
        unit_class = quote.pricing.unit_class.as_str(),
        total_price = %quote.pricing.total_price,
        "barcode_priced"
    );
    Ok(Ok(quote))
}
