//! Payment service.
//!
//! Orchestrates the calculator, the settlement rules and the gateway:
//! fetch fresh invoices, build or check an allocation set, validate it,
//! then submit the committed payload.

use std::sync::Arc;

use rust_decimal::Decimal;
use settle_shared::CandidateOrder;
use settle_shared::types::{PayerId, PaymentId};
use tracing::{debug, info, warn};

use crate::allocation::{AllocationCalculator, AllocationPayload, AllocationSet, PaymentKind};
use crate::invoice::{Invoice, InvoiceError};
use crate::payment::error::PaymentError;
use crate::payment::gateway::PaymentGateway;
use crate::payment::types::{NewPayment, Payment, RecordPaymentInput};

/// Payment service generic over the gateway implementation.
pub struct PaymentService<G: PaymentGateway> {
    gateway: Arc<G>,
    order: CandidateOrder,
}

impl<G: PaymentGateway> PaymentService<G> {
    /// Create a new payment service.
    #[must_use]
    pub fn new(gateway: Arc<G>, order: CandidateOrder) -> Self {
        Self { gateway, order }
    }

    /// The payer's invoices that can receive an allocation, in listing order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Gateway` if the invoices cannot be fetched.
    pub async fn candidate_invoices(&self, payer_id: PayerId) -> Result<Vec<Invoice>, PaymentError> {
        let invoices = self.gateway.fetch_open_invoices(payer_id).await?;
        Ok(AllocationCalculator::list_candidate_invoices(
            &invoices, payer_id, self.order,
        ))
    }

    /// Record a payment, settling at most one invoice.
    ///
    /// Without an invoice the payment is recorded as an advance. With one,
    /// the proposed amount is `min(balance_due, amount)` and any excess stays
    /// on the payment as unallocated credit.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is not positive or not representable in its currency
    /// - The invoice is not an open invoice of the payer
    /// - The gateway rejects the payment
    pub async fn record_payment(&self, input: RecordPaymentInput) -> Result<Payment, PaymentError> {
        let amount = input.amount;
        if !amount.is_positive() {
            return Err(PaymentError::NonPositiveAmount(amount.amount));
        }
        if !amount.currency.is_representable(amount.amount) {
            return Err(PaymentError::InvalidPrecision {
                amount: amount.amount,
                currency: amount.currency,
            });
        }

        let (kind, allocations) = match input.invoice_id {
            None => (PaymentKind::Advance, Vec::new()),
            Some(invoice_id) => {
                let invoices = self.gateway.fetch_open_invoices(input.payer_id).await?;
                let invoice = invoices
                    .iter()
                    .find(|inv| inv.id == invoice_id)
                    .ok_or(InvoiceError::NotFound(invoice_id))?;

                let set = AllocationCalculator::select_invoice(
                    &AllocationSet::new(input.payer_id, amount.currency),
                    invoice,
                    amount.amount,
                )?;
                AllocationCalculator::validate(&set, amount.amount, PaymentKind::WithInvoice)?;
                (PaymentKind::WithInvoice, Self::submittable(&set))
            }
        };

        let payment = self
            .gateway
            .submit_payment(NewPayment {
                payer_id: input.payer_id,
                amount,
                method: input.method,
                reference: input.reference,
                kind,
                allocations,
            })
            .await
            .inspect_err(|e| warn!(payer_id = %input.payer_id, error = %e, "Payment submission failed"))?;

        info!(
            payment_id = %payment.id,
            kind = %payment.kind,
            unallocated = %payment.unallocated(),
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Allocate an existing payment's unallocated amount across invoices.
    ///
    /// The set is checked against freshly fetched balances first; a set built
    /// on balances that have since shrunk is rejected with `StaleBalance`
    /// rather than silently reduced. Call `refresh` to bring it up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payment is voided or belongs to another payer or currency
    /// - A line amount is finer than the currency's minor unit
    /// - A balance changed since the set was built
    /// - The set fails validation against the unallocated amount
    /// - The gateway rejects the allocation
    pub async fn allocate(
        &self,
        payment_id: PaymentId,
        set: &AllocationSet,
    ) -> Result<Payment, PaymentError> {
        let payment = self.gateway.fetch_payment(payment_id).await?;
        if payment.voided {
            return Err(PaymentError::AlreadyVoided(payment_id));
        }
        if set.payer_id() != payment.payer_id {
            return Err(PaymentError::PayerMismatch {
                payment_id,
                expected: payment.payer_id,
                got: set.payer_id(),
            });
        }
        if set.currency() != payment.amount.currency {
            return Err(PaymentError::CurrencyMismatch {
                payment_id,
                expected: payment.amount.currency,
                got: set.currency(),
            });
        }

        let currency = payment.amount.currency;
        if let Some(line) = set
            .lines()
            .iter()
            .find(|line| !currency.is_representable(line.amount()))
        {
            return Err(PaymentError::InvalidPrecision {
                amount: line.amount(),
                currency,
            });
        }

        let fresh = self.gateway.fetch_open_invoices(payment.payer_id).await?;
        AllocationCalculator::ensure_current(set, &fresh)?;

        let unallocated = payment.unallocated();
        let summary = AllocationCalculator::validate(set, unallocated, PaymentKind::WithInvoice)?;

        let payment = self
            .gateway
            .submit_allocation(payment_id, Self::submittable(set))
            .await
            .inspect_err(|e| warn!(payment_id = %payment_id, error = %e, "Allocation submission failed"))?;

        info!(
            payment_id = %payment_id,
            applied = %summary.total_applied,
            residual = %summary.residual,
            "Payment allocated"
        );
        Ok(payment)
    }

    /// Allocate an existing payment oldest-first across the payer's invoices.
    ///
    /// # Errors
    ///
    /// Same as `allocate`; additionally `NoInvoicesSelected` when the payer
    /// has nothing to allocate to.
    pub async fn allocate_oldest_first(&self, payment_id: PaymentId) -> Result<Payment, PaymentError> {
        let payment = self.gateway.fetch_payment(payment_id).await?;
        let candidates: Vec<Invoice> = self
            .candidate_invoices(payment.payer_id)
            .await?
            .into_iter()
            .filter(|inv| inv.currency == payment.amount.currency)
            .collect();
        let set = AllocationCalculator::allocate_oldest_first(
            payment.payer_id,
            payment.amount.currency,
            &candidates,
            payment.unallocated(),
        )?;
        self.allocate(payment_id, &set).await
    }

    /// Bring a set up to date with the payer's current invoices.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Gateway` if the invoices cannot be fetched.
    pub async fn refresh(&self, set: &AllocationSet) -> Result<AllocationSet, PaymentError> {
        let fresh = self.gateway.fetch_open_invoices(set.payer_id()).await?;
        Ok(AllocationCalculator::refresh_balances(set, &fresh))
    }

    /// Void a payment, reversing every allocation it made.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The reason is blank
    /// - The payment is already voided
    /// - The gateway rejects the void
    pub async fn void(&self, payment_id: PaymentId, reason: &str) -> Result<Payment, PaymentError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(PaymentError::VoidReasonRequired);
        }

        let payment = self.gateway.fetch_payment(payment_id).await?;
        if payment.voided {
            return Err(PaymentError::AlreadyVoided(payment_id));
        }

        let voided = self
            .gateway
            .void_payment(payment_id, reason.to_string())
            .await
            .inspect_err(|e| warn!(payment_id = %payment_id, error = %e, "Void failed"))?;

        info!(payment_id = %payment_id, reason = %reason, "Payment voided");
        Ok(voided)
    }

    /// Committed payload without zero lines, which carry no allocation.
    fn submittable(set: &AllocationSet) -> Vec<AllocationPayload> {
        AllocationCalculator::commit(set)
            .into_iter()
            .filter(|entry| {
                let keep = entry.amount_applied > Decimal::ZERO;
                if !keep {
                    debug!(invoice_id = %entry.invoice_id, "Skipping zero allocation");
                }
                keep
            })
            .collect()
    }
}
