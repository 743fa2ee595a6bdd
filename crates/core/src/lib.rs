//! Core business logic for Settle.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Remote services are reached only through the `PaymentGateway` trait.
//!
//! # Modules
//!
//! - `invoice` - Invoice view, status lifecycle, applying and reversing payments
//! - `allocation` - Building and validating payment-to-invoice allocations
//! - `payment` - Payments, voiding, the gateway contract and the orchestrating service

pub mod allocation;
pub mod invoice;
pub mod payment;
