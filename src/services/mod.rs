//! Services - business logic and state management
//!
//! This module contains the core business logic services:
//! - `decoder` - Slices a raw scan into product code and weight
//! - `resolver` - Product code normalization and catalog lookup
//! - `pricing` - Unit-aware price computation
//! - `quote` - Decode, resolve and price in one call
//! - `order_draft` - Order lines built up at a scan station
//! - `scan_session` - Scan state machine with duplicate suppression
//! - `scan_worker` - Async worker polling a scan source

pub mod decoder;
pub mod order_draft;
pub mod pricing;
pub mod quote;
pub mod resolver;
pub mod scan_session;
pub mod scan_worker;

// Re-export commonly used types
pub use decoder::{decode, DecodeError};
pub use order_draft::{OrderDraft, OrderLine};
pub use pricing::{compute_price, PricingResult, UnitClass};
pub use quote::{decode_and_price, QuoteResult, ScanError, ScanQuote};
pub use resolver::{resolve, MatchKind, ProductLookup, ProductMatch};
pub use scan_session::{ScanOutcome, ScanSession, ScanState};
pub use scan_worker::{ScanReport, ScanWorker};
