//! Price computation by unit of sale
//!
//! | class    | unit strings                  | price                         |
//! |----------|-------------------------------|-------------------------------|
//! | kilogram | кг, kg                        | price per kg x weight in kg   |
//! | gram     | г, g                          | price per gram x grams        |
//! | per 100g | 100г, 100g, 100 г, 100 g      | price per 100 g x (grams/100) |
//! | portion  | contains порция/portion/pc/шт | flat price                    |
//! | other    | anything else                 | price x weight                |
//!
//! Gram-to-kg and gram-to-100g conversion only happens when the barcode
//! weight unit is grams.

use crate::domain::barcode::BarcodeConfig;
use crate::domain::types::{Product, WeightUnit};
use serde::Serialize;

/// Unit labels shown for 100 g products priced from a gram weight
const GRAM_DISPLAY_UNIT: &str = "г";

/// Classification of a product's unit of sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    Kilogram,
    Gram,
    Per100g,
    Portion,
    Other,
}

impl UnitClass {
    /// Classify a unit string (trimmed, case-insensitive)
    pub fn classify(unit: &str) -> Self {
        let unit = unit.trim().to_lowercase();
        match unit.as_str() {
            "кг" | "kg" => UnitClass::Kilogram,
            "г" | "g" => UnitClass::Gram,
            "100г" | "100g" | "100 г" | "100 g" => UnitClass::Per100g,
            u if ["порция", "portion", "pc", "шт"].iter().any(|p| u.contains(p)) => {
                UnitClass::Portion
            }
            _ => UnitClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitClass::Kilogram => "kilogram",
            UnitClass::Gram => "gram",
            UnitClass::Per100g => "per_100g",
            UnitClass::Portion => "portion",
            UnitClass::Other => "other",
        }
    }
}

/// Weight and price shown for a priced scan
#[derive(Debug, Clone, PartialEq)]
pub struct PricingResult {
    pub unit_class: UnitClass,
    pub display_weight: f64,
    pub display_unit: String,
    pub total_price: f64,
}

/// Round a money amount to cents, halves away from zero
#[inline]
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Price `product` for an encoded weight under `config`
pub fn compute_price(product: &Product, weight_raw: u64, config: &BarcodeConfig) -> PricingResult {
    let weight = config.scaled_weight(weight_raw);
    let in_grams = config.weight_unit == WeightUnit::G;
    let config_unit = config.weight_unit.as_str().to_string();
    let unit_class = UnitClass::classify(&product.unit);

    let (display_weight, display_unit, total_price) = match unit_class {
        UnitClass::Kilogram => {
            let price_per_kg = product.price_per_kg.filter(|p| *p != 0.0).unwrap_or(product.price);
            if in_grams {
                let kg = weight / 1000.0;
                (kg, product.unit.clone(), round_money(price_per_kg * kg))
            } else {
                (weight, config_unit, round_money(price_per_kg * weight))
            }
        }
        UnitClass::Gram => (weight, config_unit, round_money(product.price * weight)),
        UnitClass::Per100g => {
            if in_grams {
                let hundreds = weight / 100.0;
                (weight, GRAM_DISPLAY_UNIT.to_string(), round_money(product.price * hundreds))
            } else {
                (weight, config_unit, round_money(product.price * weight))
            }
        }
        UnitClass::Portion => (weight, config_unit, round_money(product.price)),
        UnitClass::Other => (weight, config_unit, round_money(product.price * weight)),
    };

    PricingResult { unit_class, display_weight, display_unit, total_price }
}
