//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `catalog` - Product catalog loaded from JSON
//! - `scan_source` - Scan engine input (keyboard-wedge lines, channels)
//! - `egress` - Scan output to file (JSONL format)
//! - `http` - HTTP API for barcode config and parsing
//! - `prometheus` - Prometheus text exposition of metrics

pub mod catalog;
pub mod egress;
pub mod http;
pub mod prometheus;
pub mod scan_source;

// Re-export commonly used types
pub use catalog::Catalog;
pub use egress::ScanEgress;
pub use http::{start_api_server, ApiState};
pub use scan_source::{LineSource, ScanFrame, ScanSource};
