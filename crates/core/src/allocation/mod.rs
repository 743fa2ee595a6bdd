//! Payment-to-invoice allocation.
//!
//! An allocation set is an explicit value owned by the caller. The
//! calculator exposes pure functions over it: selecting invoices with a
//! proposed amount, editing amounts, validating the set against the payment
//! and projecting it into the payload submitted to the payment service.
//!
//! # Modules
//!
//! - `types` - AllocationSet, AllocationLine, AllocationPayload, PaymentKind
//! - `error` - Allocation validation errors
//! - `calculator` - Candidate listing, proposal, clamping, validation, commit

pub mod calculator;
pub mod error;
pub mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::AllocationCalculator;
pub use error::AllocationError;
pub use types::{AllocationLine, AllocationPayload, AllocationSet, AllocationSummary, PaymentKind};
