//! Invoice error types.

use rust_decimal::Decimal;
use settle_shared::types::InvoiceId;
use thiserror::Error;

use crate::invoice::types::InvoiceStatus;

/// Errors that can occur while applying or reversing payment on an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    /// Invoice not found in the supplied snapshot.
    #[error("Invoice {0} not found")]
    NotFound(InvoiceId),

    /// Invoice status does not accept payment.
    #[error("Invoice {id} is {status} and cannot accept payment")]
    NotPayable {
        /// The invoice.
        id: InvoiceId,
        /// Its current status.
        status: InvoiceStatus,
    },

    /// Applying the amount would pay more than the balance due.
    #[error("Amount {amount} exceeds balance due {balance_due} on invoice {id}")]
    Overpayment {
        /// The invoice.
        id: InvoiceId,
        /// The amount being applied.
        amount: Decimal,
        /// The invoice's balance due.
        balance_due: Decimal,
    },

    /// Reversing the amount would take the paid amount below zero.
    #[error("Reversal of {amount} exceeds paid amount {paid} on invoice {id}")]
    ReversalExceedsPaid {
        /// The invoice.
        id: InvoiceId,
        /// The amount being reversed.
        amount: Decimal,
        /// The amount currently paid.
        paid: Decimal,
    },

    /// Applied or reversed amounts must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}

impl InvoiceError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NonPositiveAmount(_) => 400,
            Self::NotPayable { .. } | Self::Overpayment { .. } | Self::ReversalExceedsPaid { .. } => {
                422
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "INVOICE_NOT_FOUND",
            Self::NotPayable { .. } => "INVOICE_NOT_PAYABLE",
            Self::Overpayment { .. } => "INVOICE_OVERPAYMENT",
            Self::ReversalExceedsPaid { .. } => "REVERSAL_EXCEEDS_PAID",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
        }
    }
}
