//! Invoice view and payment settlement.
//!
//! This module models the consumer-side view of an invoice and the
//! status transitions caused by applying or reversing payment amounts.
//!
//! # Modules
//!
//! - `types` - Invoice and InvoiceStatus
//! - `error` - Invoice-specific error types
//! - `settlement` - Applying and reversing amounts, status recalculation

pub mod error;
pub mod settlement;
pub mod types;

pub use error::InvoiceError;
pub use settlement::SettlementService;
pub use types::{Invoice, InvoiceStatus};
