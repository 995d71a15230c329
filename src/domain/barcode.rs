//! Barcode layout configuration and the values derived from a scan
//!
//! Positions are user-facing, 1-based and inclusive. Internally they are
//! converted to 0-based half-open character ranges.

use crate::domain::types::WeightUnit;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Highest character position an admin may configure
pub const MAX_POSITION: usize = 20;

/// Digit-range layout of a weighed-item barcode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarcodeConfig {
    pub enabled: bool,
    pub product_code_start: usize,
    pub product_code_end: usize,
    pub weight_start: usize,
    pub weight_end: usize,
    pub weight_unit: WeightUnit,
    /// Encoded weight digits are divided by this before pricing (1 = as-is)
    #[serde(default = "default_weight_divisor")]
    pub weight_divisor: u32,
}

fn default_weight_divisor() -> u32 {
    1
}

impl Default for BarcodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            product_code_start: 1,
            product_code_end: 5,
            weight_start: 6,
            weight_end: 10,
            weight_unit: WeightUnit::G,
            weight_divisor: default_weight_divisor(),
        }
    }
}

/// Rejected barcode configuration update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ProductCodeRange { start: usize, end: usize },
    WeightRange { start: usize, end: usize },
    PositionOutOfBounds { field: &'static str, value: usize },
    WeightDivisor,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ProductCodeRange { start, end } => write!(
                f,
                "Invalid barcode configuration: product code start ({start}) must be less than end ({end})"
            ),
            ConfigError::WeightRange { start, end } => write!(
                f,
                "Invalid barcode configuration: weight start ({start}) must be less than end ({end})"
            ),
            ConfigError::PositionOutOfBounds { field, value } => write!(
                f,
                "Invalid barcode configuration: {field} = {value} is outside 1..={MAX_POSITION}"
            ),
            ConfigError::WeightDivisor => {
                write!(f, "Invalid barcode configuration: weight divisor must be at least 1")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl BarcodeConfig {
    /// Check the invariants every stored configuration must hold
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positions = [
            ("productCodeStart", self.product_code_start),
            ("productCodeEnd", self.product_code_end),
            ("weightStart", self.weight_start),
            ("weightEnd", self.weight_end),
        ];
        for (field, value) in positions {
            if !(1..=MAX_POSITION).contains(&value) {
                return Err(ConfigError::PositionOutOfBounds { field, value });
            }
        }

        if self.product_code_start >= self.product_code_end {
            return Err(ConfigError::ProductCodeRange {
                start: self.product_code_start,
                end: self.product_code_end,
            });
        }
        if self.weight_start >= self.weight_end {
            return Err(ConfigError::WeightRange {
                start: self.weight_start,
                end: self.weight_end,
            });
        }
        if self.weight_divisor == 0 {
            return Err(ConfigError::WeightDivisor);
        }
        Ok(())
    }

    /// Shortest scan that covers both configured ranges
    pub fn min_length(&self) -> usize {
        self.product_code_end.max(self.weight_end)
    }

    /// 0-based half-open character range of the product code
    pub fn product_code_range(&self) -> Range<usize> {
        self.product_code_start.saturating_sub(1)..self.product_code_end
    }

    /// 0-based half-open character range of the weight digits
    pub fn weight_range(&self) -> Range<usize> {
        self.weight_start.saturating_sub(1)..self.weight_end
    }

    /// Weight value used for pricing after the configured divisor
    pub fn scaled_weight(&self, weight_raw: u64) -> f64 {
        weight_raw as f64 / f64::from(self.weight_divisor.max(1))
    }
}

/// A scan sliced according to a [`BarcodeConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedBarcode {
    pub raw: String,
    pub product_code: String,
    pub weight_raw: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pc: (usize, usize), w: (usize, usize)) -> BarcodeConfig {
        BarcodeConfig {
            enabled: true,
            product_code_start: pc.0,
            product_code_end: pc.1,
            weight_start: w.0,
            weight_end: w.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BarcodeConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.min_length(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        assert_eq!(
            config((5, 5), (6, 10)).validate(),
            Err(ConfigError::ProductCodeRange { start: 5, end: 5 })
        );
        assert_eq!(
            config((1, 5), (10, 6)).validate(),
            Err(ConfigError::WeightRange { start: 10, end: 6 })
        );
    }

    #[test]
    fn test_validate_rejects_out_of_bounds_positions() {
        assert_eq!(
            config((0, 5), (6, 10)).validate(),
            Err(ConfigError::PositionOutOfBounds { field: "productCodeStart", value: 0 })
        );
        assert_eq!(
            config((1, 5), (6, 21)).validate(),
            Err(ConfigError::PositionOutOfBounds { field: "weightEnd", value: 21 })
        );
    }

    #[test]
    fn test_overlapping_ranges_are_accepted() {
        assert!(config((1, 8), (6, 12)).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_divisor() {
        let mut c = config((1, 5), (6, 10));
        c.weight_divisor = 0;
        assert_eq!(c.validate(), Err(ConfigError::WeightDivisor));
    }

    #[test]
    fn test_ranges_are_zero_based_half_open() {
        let c = config((3, 8), (9, 13));
        assert_eq!(c.product_code_range(), 2..8);
        assert_eq!(c.weight_range(), 8..13);
        assert_eq!(c.min_length(), 13);
    }

    #[test]
    fn test_scaled_weight() {
        let mut c = config((1, 5), (6, 10));
        assert_eq!(c.scaled_weight(2804), 2804.0);
        c.weight_divisor = 10;
        assert_eq!(c.scaled_weight(2804), 280.4);
    }

    #[test]
    fn test_config_json_is_camel_case() {
        let json = serde_json::to_value(BarcodeConfig::default()).unwrap();
        assert_eq!(json["productCodeStart"], 1);
        assert_eq!(json["weightUnit"], "g");
        assert_eq!(json["weightDivisor"], 1);
    }
}
