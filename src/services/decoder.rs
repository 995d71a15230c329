//! Barcode decoder - slices a raw scan into product code and weight
//!
//! Lengths and positions count characters, so a scan containing non-ASCII
//! noise never splits a UTF-8 sequence.

use crate::domain::barcode::{BarcodeConfig, ScannedBarcode};
use std::ops::Range;

/// Why a raw scan could not be sliced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    ConfigDisabled,
    BarcodeTooShort { required: usize, actual: usize },
    InvalidWeight { weight_str: String },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::ConfigDisabled => write!(f, "Barcode system is disabled"),
            DecodeError::BarcodeTooShort { required, .. } => {
                write!(f, "Barcode too short. Expected at least {required} digits")
            }
            DecodeError::InvalidWeight { .. } => write!(f, "Invalid weight in barcode"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Slice `raw` according to `config`
pub fn decode(raw: &str, config: &BarcodeConfig) -> Result<ScannedBarcode, DecodeError> {
    if !config.enabled {
        return Err(DecodeError::ConfigDisabled);
    }

    let required = config.min_length();
    let actual = raw.chars().count();
    if actual < required {
        return Err(DecodeError::BarcodeTooShort { required, actual });
    }

    let product_code = slice_chars(raw, config.product_code_range());
    let weight_str = slice_chars(raw, config.weight_range());
    let weight_raw = parse_weight(&weight_str).ok_or(DecodeError::InvalidWeight { weight_str })?;

    Ok(ScannedBarcode { raw: raw.to_string(), product_code, weight_raw })
}

#[inline]
fn slice_chars(raw: &str, range: Range<usize>) -> String {
    raw.chars().skip(range.start).take(range.end.saturating_sub(range.start)).collect()
}

/// Digits only; empty, signed or overflowing input is rejected
fn parse_weight(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
