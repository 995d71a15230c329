//! Infrastructure - configuration, settings store and metrics
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults)
//! - `settings` - Live barcode layout with validated, persisted updates
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod metrics;
pub mod settings;

// Re-export commonly used types
pub use config::Config;
pub use metrics::Metrics;
pub use settings::{BarcodeSettings, UpdateError};
