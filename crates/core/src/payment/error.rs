//! Payment error types.

use rust_decimal::Decimal;
use settle_shared::AppError;
use settle_shared::types::{Currency, PayerId, PaymentId};
use thiserror::Error;

use crate::allocation::AllocationError;
use crate::invoice::InvoiceError;

/// Errors that can occur while recording, allocating or voiding a payment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// Payment amount must be strictly positive.
    #[error("Payment amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount has more decimal places than the currency allows.
    #[error("Amount {amount} has more decimal places than {currency} allows")]
    InvalidPrecision {
        /// The amount.
        amount: Decimal,
        /// The currency.
        currency: Currency,
    },

    /// Payment has already been voided.
    #[error("Payment {0} is already voided")]
    AlreadyVoided(PaymentId),

    /// Voiding requires a non-empty reason.
    #[error("A reason is required to void a payment")]
    VoidReasonRequired,

    /// The allocation set was built for a different payer.
    #[error("Allocation set is for payer {got}, payment {payment_id} belongs to {expected}")]
    PayerMismatch {
        /// The payment.
        payment_id: PaymentId,
        /// The payer of the payment.
        expected: PayerId,
        /// The payer of the allocation set.
        got: PayerId,
    },

    /// The allocation set was built in a different currency.
    #[error("Allocation set is in {got}, payment {payment_id} is in {expected}")]
    CurrencyMismatch {
        /// The payment.
        payment_id: PaymentId,
        /// The payment currency.
        expected: Currency,
        /// The allocation set currency.
        got: Currency,
    },

    /// Allocation rule violated.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Invoice settlement rule violated.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// The remote payment or invoice service failed.
    #[error(transparent)]
    Gateway(#[from] AppError),
}

impl PaymentError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NonPositiveAmount(_) | Self::InvalidPrecision { .. } | Self::VoidReasonRequired => {
                400
            }
            Self::AlreadyVoided(_) => 409,
            Self::PayerMismatch { .. } | Self::CurrencyMismatch { .. } => 422,
            Self::Allocation(e) => e.status_code(),
            Self::Invoice(e) => e.status_code(),
            Self::Gateway(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::InvalidPrecision { .. } => "INVALID_PRECISION",
            Self::AlreadyVoided(_) => "ALREADY_VOIDED",
            Self::VoidReasonRequired => "VOID_REASON_REQUIRED",
            Self::PayerMismatch { .. } => "PAYER_MISMATCH",
            Self::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            Self::Allocation(e) => e.error_code(),
            Self::Invoice(e) => e.error_code(),
            Self::Gateway(e) => e.error_code(),
        }
    }

    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_transient())
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        Self::from_status(err.status_code(), err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Gateway(inner) => inner,
            other => Self::from_status(other.status_code(), other.to_string()),
        }
    }
}
