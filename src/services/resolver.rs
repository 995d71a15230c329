//! Product code normalization and catalog resolution
//!
//! Scale printers and manual entry pad product codes inconsistently, so a
//! scanned code is tried against the catalog in several forms:
//! 1. exactly as scanned
//! 2. with one leading zero added
//! 3. left-padded with zeros to 6 characters
//! 4. with leading zeros stripped from both sides
//!
//! The first attempt that yields a product wins. Within one attempt the
//! first product in catalog order wins.

use crate::domain::types::Product;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Width scale labels pad product codes to
const PADDED_CODE_WIDTH: usize = 6;

/// Read-only product source consulted during resolution
///
/// Errors are transport failures (I/O, store unavailable), never "not found".
pub trait ProductLookup {
    /// Active products whose stored barcode equals `code`, in catalog order
    fn by_barcode(&self, code: &str) -> anyhow::Result<Vec<Product>>;

    /// All active products that carry a barcode, in catalog order
    fn with_barcodes(&self) -> anyhow::Result<Vec<Product>>;
}

impl ProductLookup for [Product] {
    fn by_barcode(&self, code: &str) -> anyhow::Result<Vec<Product>> {
        Ok(self
            .iter()
            .filter(|p| p.is_active && p.barcode.as_deref() == Some(code))
            .cloned()
            .collect())
    }

    fn with_barcodes(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.iter().filter(|p| p.is_active && p.barcode.is_some()).cloned().collect())
    }
}

impl ProductLookup for Vec<Product> {
    fn by_barcode(&self, code: &str) -> anyhow::Result<Vec<Product>> {
        self.as_slice().by_barcode(code)
    }

    fn with_barcodes(&self) -> anyhow::Result<Vec<Product>> {
        self.as_slice().with_barcodes()
    }
}

/// Which normalization attempt matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    LeadingZero,
    Padded,
    ZeroStripped,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Exact => "exact",
            MatchKind::LeadingZero => "leading_zero",
            MatchKind::Padded => "padded",
            MatchKind::ZeroStripped => "zero_stripped",
        }
    }
}

/// A product resolved from a scanned code
#[derive(Debug, Clone, PartialEq)]
pub struct ProductMatch {
    pub product: Product,
    pub matched_by: MatchKind,
}

/// Code with leading zeros removed ("00058" -> "58", "000" -> "")
#[inline]
pub fn strip_leading_zeros(code: &str) -> &str {
    code.trim_start_matches('0')
}

/// Exact-equality variants of `code`, in attempt order, without repeats
pub fn code_variants(code: &str) -> SmallVec<[(MatchKind, String); 3]> {
    let mut variants: SmallVec<[(MatchKind, String); 3]> = SmallVec::new();
    let candidates = [
        (MatchKind::Exact, code.to_string()),
        (MatchKind::LeadingZero, format!("0{code}")),
        (MatchKind::Padded, format!("{:0>width$}", code, width = PADDED_CODE_WIDTH)),
    ];
    for (kind, variant) in candidates {
        if !variants.iter().any(|(_, v)| *v == variant) {
            variants.push((kind, variant));
        }
    }
    variants
}

/// Resolve a scanned product code against `lookup`
///
/// Returns `Ok(None)` when no normalization variant matches.
pub fn resolve<L>(code: &str, lookup: &L) -> anyhow::Result<Option<ProductMatch>>
where
    L: ProductLookup + ?Sized,
{
    for (kind, variant) in code_variants(code) {
        let mut candidates = lookup.by_barcode(&variant)?;
        if candidates.is_empty() {
            continue;
        }
        if candidates.len() > 1 {
            warn!(
                code = %code,
                variant = %variant,
                candidates = %candidates.len(),
                "barcode_ambiguous_match"
            );
        }
        let product = candidates.swap_remove(0);
        debug!(code = %code, product_id = %product.id, matched_by = kind.as_str(), "barcode_resolved");
        return Ok(Some(ProductMatch { product, matched_by: kind }));
    }

    let normalized = strip_leading_zeros(code);
    if normalized.is_empty() {
        debug!(code = %code, "barcode_all_zero_code");
        return Ok(None);
    }

    let mut matches = lookup
        .with_barcodes()?
        .into_iter()
        .filter(|p| p.barcode.as_deref().map(strip_leading_zeros) == Some(normalized));

    let Some(product) = matches.next() else {
        debug!(code = %code, "barcode_unresolved");
        return Ok(None);
    };
    let extra = matches.count();
    if extra > 0 {
        warn!(code = %code, candidates = %(extra + 1), "barcode_ambiguous_match");
    }

    debug!(
        code = %code,
        product_id = %product.id,
        matched_by = MatchKind::ZeroStripped.as_str(),
        "barcode_resolved"
    );
    Ok(Some(ProductMatch { product, matched_by: MatchKind::ZeroStripped }))
}
