//! Allocation domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_shared::types::{Currency, InvoiceId, PayerId};
use std::fmt;

/// Whether a payment is meant to settle invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Held as payer credit, no invoice required.
    Advance,
    /// Must be allocated to at least one invoice.
    #[default]
    WithInvoice,
}

impl PaymentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::WithInvoice => "with_invoice",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One selected invoice and the amount proposed for it.
///
/// `balance_due` is the snapshot the amount is clamped against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationLine {
    invoice_id: InvoiceId,
    invoice_number: String,
    balance_due: Decimal,
    amount: Decimal,
}

impl AllocationLine {
    pub(crate) fn new(
        invoice_id: InvoiceId,
        invoice_number: String,
        balance_due: Decimal,
        amount: Decimal,
    ) -> Self {
        let balance_due = balance_due.max(Decimal::ZERO);
        Self {
            invoice_id,
            invoice_number,
            balance_due,
            amount: clamp(amount, balance_due),
        }
    }

    /// The selected invoice.
    #[must_use]
    pub fn invoice_id(&self) -> InvoiceId {
        self.invoice_id
    }

    /// The invoice number at selection time.
    #[must_use]
    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    /// Balance due snapshot the amount is bounded by.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        self.balance_due
    }

    /// Amount to apply, always within `[0, balance_due]`.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub(crate) fn set_amount(&mut self, amount: Decimal) {
        self.amount = clamp(amount, self.balance_due);
    }

    pub(crate) fn set_balance_due(&mut self, balance_due: Decimal) {
        self.balance_due = balance_due.max(Decimal::ZERO);
        self.amount = clamp(self.amount, self.balance_due);
    }
}

fn clamp(amount: Decimal, balance_due: Decimal) -> Decimal {
    amount.max(Decimal::ZERO).min(balance_due)
}

/// The invoices selected for one payment, in selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSet {
    payer_id: PayerId,
    currency: Currency,
    lines: Vec<AllocationLine>,
}

impl AllocationSet {
    /// Creates an empty set for a payer's payment in `currency`.
    #[must_use]
    pub fn new(payer_id: PayerId, currency: Currency) -> Self {
        Self {
            payer_id,
            currency,
            lines: Vec::new(),
        }
    }

    /// The payer whose invoices may be selected.
    #[must_use]
    pub fn payer_id(&self) -> PayerId {
        self.payer_id
    }

    /// Currency of the payment and of every selected invoice.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Selected lines in selection order.
    #[must_use]
    pub fn lines(&self) -> &[AllocationLine] {
        &self.lines
    }

    /// Number of selected invoices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if no invoice is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns true if the invoice is selected.
    #[must_use]
    pub fn contains(&self, invoice_id: InvoiceId) -> bool {
        self.get(invoice_id).is_some()
    }

    /// The line for an invoice, if selected.
    #[must_use]
    pub fn get(&self, invoice_id: InvoiceId) -> Option<&AllocationLine> {
        self.lines.iter().find(|l| l.invoice_id == invoice_id)
    }

    /// Sum of all line amounts.
    #[must_use]
    pub fn total_applied(&self) -> Decimal {
        self.lines.iter().map(|l| l.amount).sum()
    }

    /// Unallocated part of `payment_amount`; negative when over-allocated.
    #[must_use]
    pub fn remaining(&self, payment_amount: Decimal) -> Decimal {
        payment_amount - self.total_applied()
    }

    pub(crate) fn push(&mut self, line: AllocationLine) {
        self.lines.push(line);
    }

    pub(crate) fn get_mut(&mut self, invoice_id: InvoiceId) -> Option<&mut AllocationLine> {
        self.lines.iter_mut().find(|l| l.invoice_id == invoice_id)
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&mut AllocationLine) -> bool) {
        self.lines.retain_mut(f);
    }
}

/// Submission entry sent to the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPayload {
    /// The invoice receiving the amount.
    pub invoice_id: InvoiceId,
    /// The amount applied to it.
    pub amount_applied: Decimal,
}

/// Result of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    /// Sum of all allocated amounts.
    pub total_applied: Decimal,
    /// Part of the payment left unallocated, kept as advance credit.
    pub residual: Decimal,
}
