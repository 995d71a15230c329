//! Domain models - barcode layout, scans and catalog products
//!
//! This module contains the canonical data types used throughout the system:
//! - `BarcodeConfig` - admin-configurable digit-range layout
//! - `ScannedBarcode` - a scan sliced into product code and weight
//! - `Product` - catalog entry as read by resolution and pricing
//! - `WeightUnit` - unit of the encoded weight digits

pub mod barcode;
pub mod types;

pub use barcode::{BarcodeConfig, ConfigError, ScannedBarcode, MAX_POSITION};
pub use types::{Product, ProductId, WeightUnit};
