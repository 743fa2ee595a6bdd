//! Allocation error types.
//!
//! Every variant describes a locally-known rule. Failures from the remote
//! payment service are reported separately as `settle_shared::AppError`.

use rust_decimal::Decimal;
use settle_shared::types::{Currency, InvoiceId, PayerId};
use thiserror::Error;

use crate::invoice::InvoiceStatus;

/// Errors returned while building or validating an allocation set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Total applied exceeds the payment amount.
    #[error("Allocated total {total_applied} exceeds payment amount {payment_amount}")]
    OverAllocated {
        /// Sum of allocated amounts.
        total_applied: Decimal,
        /// The payment amount.
        payment_amount: Decimal,
    },

    /// Invoices are selected but nothing is allocated.
    #[error("Invoices are selected but no amount is allocated")]
    EmptyAllocation,

    /// Payment requires an invoice but none is selected.
    #[error("Payment must be allocated to at least one invoice")]
    NoInvoicesSelected,

    /// Amount is not a number or is negative.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The invoice is not part of the allocation set.
    #[error("Invoice {0} is not selected")]
    InvoiceNotSelected(InvoiceId),

    /// The invoice cannot receive an allocation.
    #[error("Invoice {id} is {status} with balance due {balance_due} and cannot be allocated")]
    InvoiceNotPayable {
        /// The invoice.
        id: InvoiceId,
        /// Its status.
        status: InvoiceStatus,
        /// Its balance due.
        balance_due: Decimal,
    },

    /// The invoice belongs to a different payer.
    #[error("Invoice {invoice_id} belongs to payer {got}, expected {expected}")]
    PayerMismatch {
        /// The invoice.
        invoice_id: InvoiceId,
        /// The payer of the payment.
        expected: PayerId,
        /// The payer on the invoice.
        got: PayerId,
    },

    /// The invoice is billed in a different currency.
    #[error("Invoice {invoice_id} is in {got}, expected {expected}")]
    CurrencyMismatch {
        /// The invoice.
        invoice_id: InvoiceId,
        /// The payment currency.
        expected: Currency,
        /// The invoice currency.
        got: Currency,
    },

    /// The invoice changed since it was selected.
    #[error("Invoice {invoice_id} now has balance due {balance_due}, below the allocated {amount}")]
    StaleBalance {
        /// The invoice.
        invoice_id: InvoiceId,
        /// The amount in the allocation set.
        amount: Decimal,
        /// The current balance due, zero if the invoice is no longer payable.
        balance_due: Decimal,
    },
}

impl AllocationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::NoInvoicesSelected | Self::EmptyAllocation => 400,
            Self::InvoiceNotSelected(_) => 404,
            Self::StaleBalance { .. } => 409,
            Self::OverAllocated { .. }
            | Self::InvoiceNotPayable { .. }
            | Self::PayerMismatch { .. }
            | Self::CurrencyMismatch { .. } => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OverAllocated { .. } => "OVER_ALLOCATED",
            Self::EmptyAllocation => "EMPTY_ALLOCATION",
            Self::NoInvoicesSelected => "NO_INVOICES_SELECTED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvoiceNotSelected(_) => "INVOICE_NOT_SELECTED",
            Self::InvoiceNotPayable { .. } => "INVOICE_NOT_PAYABLE",
            Self::PayerMismatch { .. } => "PAYER_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::StaleBalance { .. } => "STALE_BALANCE",
        }
    }
}
