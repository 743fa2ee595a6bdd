//! Allocation calculator.
//!
//! Stateless functions over a caller-owned [`AllocationSet`]. Operations that
//! edit a set take it by reference and return an updated copy, so a failed
//! edit leaves the caller's set as it was.

use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;
use settle_shared::CandidateOrder;
use settle_shared::types::{Currency, InvoiceId, PayerId};

use crate::allocation::error::AllocationError;
use crate::allocation::types::{
    AllocationLine, AllocationPayload, AllocationSet, AllocationSummary, PaymentKind,
};
use crate::invoice::Invoice;

/// Stateless calculator for payment-to-invoice allocation.
pub struct AllocationCalculator;

impl AllocationCalculator {
    /// Invoices of `payer_id` that can still receive an allocation.
    ///
    /// Paid, void and zero-balance invoices are excluded. The result is
    /// ordered by `order`, ties broken by invoice number then ID, so the same
    /// snapshot always yields the same sequence.
    #[must_use]
    pub fn list_candidate_invoices(
        invoices: &[Invoice],
        payer_id: PayerId,
        order: CandidateOrder,
    ) -> Vec<Invoice> {
        let mut candidates: Vec<Invoice> = invoices
            .iter()
            .filter(|inv| inv.payer_id == payer_id && inv.is_payable())
            .cloned()
            .collect();

        candidates.sort_by(|a, b| Self::compare_candidates(a, b, order));
        candidates
    }

    fn compare_candidates(a: &Invoice, b: &Invoice, order: CandidateOrder) -> Ordering {
        let primary = match order {
            CandidateOrder::IssueDate => a.issue_date.cmp(&b.issue_date),
            // `None` sorts after every date
            CandidateOrder::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };

        primary
            .then_with(|| a.number.cmp(&b.number))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Amount proposed when an invoice is selected.
    ///
    /// Returns `min(balance_due, remaining)`, or zero when nothing of the
    /// payment remains. Never negative.
    #[must_use]
    pub fn auto_allocate(invoice: &Invoice, remaining: Decimal) -> Decimal {
        if remaining <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        invoice.balance_due().min(remaining)
    }

    /// Checks that `invoice` may be added to `set`.
    pub fn ensure_selectable(set: &AllocationSet, invoice: &Invoice) -> Result<(), AllocationError> {
        if invoice.payer_id != set.payer_id() {
            return Err(AllocationError::PayerMismatch {
                invoice_id: invoice.id,
                expected: set.payer_id(),
                got: invoice.payer_id,
            });
        }
        if invoice.currency != set.currency() {
            return Err(AllocationError::CurrencyMismatch {
                invoice_id: invoice.id,
                expected: set.currency(),
                got: invoice.currency,
            });
        }
        if !invoice.is_payable() {
            return Err(AllocationError::InvoiceNotPayable {
                id: invoice.id,
                status: invoice.status,
                balance_due: invoice.balance_due(),
            });
        }
        Ok(())
    }

    /// Add an invoice with the amount proposed by [`Self::auto_allocate`].
    ///
    /// The proposal uses what remains of `payment_amount` after the lines
    /// already in the set. When nothing remains the invoice is still added,
    /// with a zero amount left for manual correction. Selecting an invoice
    /// twice returns the set unchanged.
    pub fn select_invoice(
        set: &AllocationSet,
        invoice: &Invoice,
        payment_amount: Decimal,
    ) -> Result<AllocationSet, AllocationError> {
        if set.contains(invoice.id) {
            return Ok(set.clone());
        }
        Self::ensure_selectable(set, invoice)?;

        let proposed = Self::auto_allocate(invoice, set.remaining(payment_amount));
        let mut updated = set.clone();
        updated.push(AllocationLine::new(
            invoice.id,
            invoice.number.clone(),
            invoice.balance_due(),
            proposed,
        ));
        Ok(updated)
    }

    /// Remove an invoice from the set. Unknown invoices are ignored.
    #[must_use]
    pub fn deselect_invoice(set: &AllocationSet, invoice_id: InvoiceId) -> AllocationSet {
        let mut updated = set.clone();
        updated.retain(|line| line.invoice_id() != invoice_id);
        updated
    }

    /// Set the amount for a selected invoice, clamped into `[0, balance_due]`.
    ///
    /// The payment total is not a bound here. An over-allocated set may exist
    /// while it is being edited; [`Self::validate`] rejects it.
    pub fn set_allocation_amount(
        set: &AllocationSet,
        invoice_id: InvoiceId,
        new_amount: Decimal,
    ) -> Result<AllocationSet, AllocationError> {
        let mut updated = set.clone();
        let line = updated
            .get_mut(invoice_id)
            .ok_or(AllocationError::InvoiceNotSelected(invoice_id))?;
        line.set_amount(new_amount);
        Ok(updated)
    }

    /// Parse a user-entered amount.
    ///
    /// Surrounding whitespace is ignored. Empty, non-numeric and negative
    /// input is rejected.
    pub fn parse_amount(input: &str) -> Result<Decimal, AllocationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AllocationError::InvalidAmount("amount is required".to_string()));
        }

        let amount = Decimal::from_str(trimmed)
            .map_err(|_| AllocationError::InvalidAmount(format!("'{trimmed}' is not a number")))?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AllocationError::InvalidAmount(format!(
                "'{trimmed}' is negative"
            )));
        }
        Ok(amount)
    }

    /// Validate a set before submission.
    ///
    /// # Returns
    /// * `Ok(AllocationSummary)` with the total applied and the residual
    /// * `Err(AllocationError::InvalidAmount)` if `payment_amount` is negative
    /// * `Err(AllocationError::NoInvoicesSelected)` if the set is empty for a
    ///   `WithInvoice` payment
    /// * `Err(AllocationError::OverAllocated)` if the total exceeds `payment_amount`
    /// * `Err(AllocationError::EmptyAllocation)` if invoices are selected but
    ///   the total is zero
    pub fn validate(
        set: &AllocationSet,
        payment_amount: Decimal,
        kind: PaymentKind,
    ) -> Result<AllocationSummary, AllocationError> {
        if payment_amount < Decimal::ZERO {
            return Err(AllocationError::InvalidAmount(format!(
                "payment amount {payment_amount} is negative"
            )));
        }

        if set.is_empty() && kind == PaymentKind::WithInvoice {
            return Err(AllocationError::NoInvoicesSelected);
        }

        let total_applied = set.total_applied();
        if total_applied > payment_amount {
            return Err(AllocationError::OverAllocated {
                total_applied,
                payment_amount,
            });
        }

        if !set.is_empty() && total_applied.is_zero() {
            return Err(AllocationError::EmptyAllocation);
        }

        Ok(AllocationSummary {
            total_applied,
            residual: payment_amount - total_applied,
        })
    }

    /// Project a set into the payload submitted to the payment service.
    ///
    /// One entry per selected invoice, amounts unchanged.
    #[must_use]
    pub fn commit(set: &AllocationSet) -> Vec<AllocationPayload> {
        set.lines()
            .iter()
            .map(|line| AllocationPayload {
                invoice_id: line.invoice_id(),
                amount_applied: line.amount(),
            })
            .collect()
    }

    /// Fill the payment across `candidates` in the given order.
    ///
    /// Selection stops as soon as the payment is exhausted, so no zero lines
    /// are produced.
    pub fn allocate_oldest_first(
        payer_id: PayerId,
        currency: Currency,
        candidates: &[Invoice],
        payment_amount: Decimal,
    ) -> Result<AllocationSet, AllocationError> {
        let mut set = AllocationSet::new(payer_id, currency);
        for invoice in candidates {
            if set.remaining(payment_amount) <= Decimal::ZERO {
                break;
            }
            set = Self::select_invoice(&set, invoice, payment_amount)?;
        }
        Ok(set)
    }

    /// Re-base a set on a freshly fetched invoice snapshot.
    ///
    /// Lines whose invoice is missing or no longer payable are dropped. The
    /// rest take the new balance due and are clamped to it.
    #[must_use]
    pub fn refresh_balances(set: &AllocationSet, fresh: &[Invoice]) -> AllocationSet {
        let mut updated = set.clone();
        updated.retain(|line| {
            match fresh.iter().find(|inv| inv.id == line.invoice_id()) {
                Some(invoice) if invoice.is_payable() => {
                    line.set_balance_due(invoice.balance_due());
                    true
                }
                _ => {
                    tracing::debug!(
                        invoice_id = %line.invoice_id(),
                        "dropping allocation line for invoice no longer payable"
                    );
                    false
                }
            }
        });
        updated
    }

    /// Checks every line against a fresh snapshot without changing the set.
    ///
    /// Fails with `StaleBalance` for the first line whose invoice is gone,
    /// no longer payable, or now owes less than the line applies.
    pub fn ensure_current(set: &AllocationSet, fresh: &[Invoice]) -> Result<(), AllocationError> {
        for line in set.lines() {
            let balance_due = fresh
                .iter()
                .find(|inv| inv.id == line.invoice_id())
                .filter(|inv| inv.is_payable())
                .map_or(Decimal::ZERO, Invoice::balance_due);

            if line.amount() > balance_due {
                return Err(AllocationError::StaleBalance {
                    invoice_id: line.invoice_id(),
                    amount: line.amount(),
                    balance_due,
                });
            }
        }
        Ok(())
    }
}
