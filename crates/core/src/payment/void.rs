//! Voiding payments.
//!
//! A void marks the payment and reverses each of its allocations against the
//! invoices they were applied to. It happens at most once per payment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::allocation::AllocationPayload;
use crate::invoice::{Invoice, SettlementService};
use crate::payment::error::PaymentError;
use crate::payment::types::{Payment, VoidOutcome};

/// Stateless service for voiding payments.
pub struct VoidService;

impl VoidService {
    /// Void a payment and reverse its allocations.
    ///
    /// `invoices` must contain every invoice the payment was allocated to.
    /// Nothing is returned unless every reversal succeeds.
    ///
    /// # Errors
    ///
    /// * `PaymentError::AlreadyVoided` if the payment was voided before
    /// * `PaymentError::VoidReasonRequired` if `reason` is blank
    /// * `PaymentError::Invoice` if an invoice is missing or cannot be reversed
    pub fn void(
        payment: &Payment,
        invoices: &[Invoice],
        reason: &str,
        voided_at: DateTime<Utc>,
    ) -> Result<VoidOutcome, PaymentError> {
        if payment.voided {
            return Err(PaymentError::AlreadyVoided(payment.id));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentError::VoidReasonRequired);
        }

        let reversals: Vec<AllocationPayload> = payment
            .allocations
            .iter()
            .filter(|a| a.amount_applied > Decimal::ZERO)
            .cloned()
            .collect();
        let invoices = SettlementService::reverse_allocations(invoices, &reversals)?;

        let mut voided = payment.clone();
        voided.voided = true;
        voided.void_reason = Some(reason.to_string());
        voided.voided_at = Some(voided_at);

        Ok(VoidOutcome {
            payment: voided,
            invoices,
        })
    }
}
