//! Order being assembled at a scan station
//!
//! Lines are keyed by product; a rescan of a product already in the order
//! replaces the line's weight and price rather than adding a second line.

use crate::domain::types::{Product, ProductId};
use crate::services::quote::ScanQuote;
use serde::Serialize;
use tracing::{info, warn};

/// One product line in the draft order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: Product,
    pub weight: f64,
    pub unit: String,
    pub total_price: f64,
}

impl OrderLine {
    fn from_quote(quote: &ScanQuote) -> Self {
        Self {
            product: quote.product.clone(),
            weight: quote.pricing.display_weight,
            unit: quote.pricing.display_unit.clone(),
            total_price: quote.pricing.total_price,
        }
    }
}

#[derive(Debug, Default)]
pub struct OrderDraft {
    lines: Vec<OrderLine>,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product.id == product_id)
    }

    /// Replace weight and price of an existing line
    /// Returns false when the product is not in the order
    pub fn update_line(&mut self, product_id: ProductId, quote: &ScanQuote) -> bool {
        let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product_id) else {
            warn!(product_id = %product_id, "order_line_missing");
            return false;
        };
        line.weight = quote.pricing.display_weight;
        line.unit = quote.pricing.display_unit.clone();
        line.total_price = quote.pricing.total_price;
        info!(
            product_id = %product_id,
            weight = %line.weight,
            unit = %line.unit,
            total_price = %line.total_price,
            "order_line_updated"
        );
        true
    }

    /// Add a confirmed new line
    /// Returns false for a zero weight or a product already present
    pub fn add_line(&mut self, quote: &ScanQuote) -> bool {
        if quote.pricing.display_weight <= 0.0 {
            warn!(product_id = %quote.product.id, "order_line_zero_weight");
            return false;
        }
        if self.contains(quote.product.id) {
            return self.update_line(quote.product.id, quote);
        }
        let line = OrderLine::from_quote(quote);
        info!(
            product_id = %line.product.id,
            name = %line.product.name,
            weight = %line.weight,
            total_price = %line.total_price,
            "order_line_added"
        );
        self.lines.push(line);
        true
    }

    pub fn total(&self) -> f64 {
        crate::services::pricing::round_money(self.lines.iter().map(|l| l.total_price).sum())
    }
}
