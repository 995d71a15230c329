//! Product catalog loaded from a JSON file
//!
//! The file is a JSON array of products. Only active products are kept,
//! ordered by name and then id; that order is the tie-break whenever more
//! than one product matches a scanned code.

use crate::domain::types::Product;
use crate::services::resolver::{strip_leading_zeros, ProductLookup};
use anyhow::Context;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct Catalog {
    /// Active products in catalog order
    products: Vec<Product>,
    /// Exact stored barcode -> indices into `products`, ascending
    by_code: FxHashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        let total = products.len();
        let mut products: Vec<Product> = products.into_iter().filter(|p| p.is_active).collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.0.cmp(&b.id.0)));

        let mut by_code: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        let mut by_normalized: FxHashMap<&str, usize> = FxHashMap::default();
        for (idx, product) in products.iter().enumerate() {
            let Some(code) = product.barcode.as_deref() else {
                continue;
            };
            by_code.entry(code.to_string()).or_default().push(idx);

            let normalized = strip_leading_zeros(code);
            if let Some(&first) = by_normalized.get(normalized) {
                warn!(
                    code = %code,
                    product_id = %product.id,
                    shadowed_by = %products[first].id,
                    "catalog_duplicate_barcode"
                );
            } else {
                by_normalized.insert(normalized, idx);
            }
        }

        info!(
            products = %products.len(),
            inactive = %(total - products.len()),
            barcodes = %by_code.len(),
            "catalog_loaded"
        );
        Self { products, by_code }
    }

    /// Load a JSON array of products
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        let products: Vec<Product> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
        Ok(Self::new(products))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }
}

impl ProductLookup for Catalog {
    fn by_barcode(&self, code: &str) -> anyhow::Result<Vec<Product>> {
        Ok(self
            .by_code
            .get(code)
            .map(|idxs| idxs.iter().map(|&i| self.products[i].clone()).collect())
            .unwrap_or_default())
    }

    fn with_barcodes(&self) -> anyhow::Result<Vec<Product>> {
        Ok(self.products.iter().filter(|p| p.barcode.is_some()).cloned().collect())
    }
}
