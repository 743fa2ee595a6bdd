//! Settlement of payment amounts against invoices.
//!
//! Applying and reversing amounts are pure transformations: they return an
//! updated copy of the invoice and leave the input untouched, so a batch
//! either succeeds as a whole or changes nothing.

use rust_decimal::Decimal;

use crate::allocation::types::AllocationPayload;
use crate::invoice::error::InvoiceError;
use crate::invoice::types::{Invoice, InvoiceStatus};

/// Stateless service for invoice settlement.
pub struct SettlementService;

impl SettlementService {
    /// Apply a payment amount to an invoice.
    ///
    /// # Returns
    /// * `Ok(Invoice)` with the paid amount increased and status recalculated
    /// * `Err(InvoiceError::NonPositiveAmount)` if `amount <= 0`
    /// * `Err(InvoiceError::NotPayable)` if the status does not accept payment
    /// * `Err(InvoiceError::Overpayment)` if `amount` exceeds the balance due
    pub fn apply_payment(invoice: &Invoice, amount: Decimal) -> Result<Invoice, InvoiceError> {
        if amount <= Decimal::ZERO {
            return Err(InvoiceError::NonPositiveAmount(amount));
        }
        if !invoice.status.accepts_payment() {
            return Err(InvoiceError::NotPayable {
                id: invoice.id,
                status: invoice.status,
            });
        }

        let balance_due = invoice.balance_due();
        if amount > balance_due {
            return Err(InvoiceError::Overpayment {
                id: invoice.id,
                amount,
                balance_due,
            });
        }

        let mut updated = invoice.clone();
        updated.paid += amount;
        updated.status = Self::recalculate_status(updated.total, updated.paid, invoice.status);
        Ok(updated)
    }

    /// Reverse a previously applied amount.
    ///
    /// A void invoice keeps its status; every other invoice is recalculated,
    /// so a paid invoice that regains a balance falls back to partial or open.
    ///
    /// # Returns
    /// * `Ok(Invoice)` with the paid amount decreased
    /// * `Err(InvoiceError::NonPositiveAmount)` if `amount <= 0`
    /// * `Err(InvoiceError::ReversalExceedsPaid)` if `amount` exceeds the paid amount
    pub fn reverse_payment(invoice: &Invoice, amount: Decimal) -> Result<Invoice, InvoiceError> {
        if amount <= Decimal::ZERO {
            return Err(InvoiceError::NonPositiveAmount(amount));
        }
        if amount > invoice.paid {
            return Err(InvoiceError::ReversalExceedsPaid {
                id: invoice.id,
                amount,
                paid: invoice.paid,
            });
        }

        let mut updated = invoice.clone();
        updated.paid -= amount;
        updated.status = Self::recalculate_status(updated.total, updated.paid, invoice.status);
        Ok(updated)
    }

    /// Status implied by the paid amount.
    #[must_use]
    pub fn recalculate_status(
        total: Decimal,
        paid: Decimal,
        current: InvoiceStatus,
    ) -> InvoiceStatus {
        if current == InvoiceStatus::Void {
            return InvoiceStatus::Void;
        }
        if paid <= Decimal::ZERO {
            return match current {
                InvoiceStatus::Draft => InvoiceStatus::Draft,
                _ => InvoiceStatus::Open,
            };
        }
        if paid >= total {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Partial
        }
    }

    /// Apply a committed allocation payload to a snapshot of invoices.
    ///
    /// Returns the updated invoices in first-touched order. Fails without
    /// partial effect if any allocation cannot be applied.
    pub fn apply_allocations(
        invoices: &[Invoice],
        allocations: &[AllocationPayload],
    ) -> Result<Vec<Invoice>, InvoiceError> {
        Self::settle_each(invoices, allocations, Self::apply_payment)
    }

    /// Reverse a committed allocation payload against a snapshot of invoices.
    pub fn reverse_allocations(
        invoices: &[Invoice],
        allocations: &[AllocationPayload],
    ) -> Result<Vec<Invoice>, InvoiceError> {
        Self::settle_each(invoices, allocations, Self::reverse_payment)
    }

    fn settle_each(
        invoices: &[Invoice],
        allocations: &[AllocationPayload],
        step: fn(&Invoice, Decimal) -> Result<Invoice, InvoiceError>,
    ) -> Result<Vec<Invoice>, InvoiceError> {
        let mut touched: Vec<Invoice> = Vec::with_capacity(allocations.len());

        for allocation in allocations {
            if let Some(existing) = touched
                .iter_mut()
                .find(|inv| inv.id == allocation.invoice_id)
            {
                *existing = step(existing, allocation.amount_applied)?;
                continue;
            }

            let invoice = invoices
                .iter()
                .find(|inv| inv.id == allocation.invoice_id)
                .ok_or(InvoiceError::NotFound(allocation.invoice_id))?;
            touched.push(step(invoice, allocation.amount_applied)?);
        }

        Ok(touched)
    }
}
