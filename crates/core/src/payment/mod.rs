//! Payments and their lifecycle.
//!
//! # Modules
//!
//! - `types` - Payment, PaymentMethod and submission payloads
//! - `error` - Payment-specific error types
//! - `void` - Reversing a payment's allocations exactly once
//! - `gateway` - Contract of the remote payment and invoice services
//! - `memory` - In-memory gateway used by tests and the CLI
//! - `service` - Orchestration of fetch, allocation, validation and submission

pub mod error;
pub mod gateway;
pub mod memory;
pub mod service;
pub mod types;
pub mod void;

#[cfg(test)]
mod void_props;

pub use error::PaymentError;
pub use gateway::PaymentGateway;
pub use memory::InMemoryGateway;
pub use service::PaymentService;
pub use types::{NewPayment, Payment, PaymentMethod, RecordPaymentInput, VoidOutcome};
pub use void::VoidService;
