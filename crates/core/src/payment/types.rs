//! Payment domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_shared::types::{InvoiceId, Money, PayerId, PaymentId};
use std::fmt;

use crate::allocation::{AllocationPayload, PaymentKind};
use crate::invoice::Invoice;

/// How the payer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash
    Cash,
    /// Bank transfer
    Transfer,
    /// Credit or debit card
    Card,
    /// Check/cheque
    Check,
    /// Anything else
    Other,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Card => "card",
            Self::Check => "check",
            Self::Other => "other",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "transfer" => Some(Self::Transfer),
            "card" => Some(Self::Card),
            "check" => Some(Self::Check),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded payment.
///
/// Amount and method are fixed at creation. Allocations accumulate until the
/// payment is voided; a voided payment accepts no further change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Who paid.
    pub payer_id: PayerId,
    /// Total amount and currency.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// External reference (bank ref, check number).
    #[serde(default)]
    pub reference: Option<String>,
    /// Advance or invoice payment.
    pub kind: PaymentKind,
    /// Amounts applied to invoices.
    #[serde(default)]
    pub allocations: Vec<AllocationPayload>,
    /// When the payment was recorded.
    pub created_at: DateTime<Utc>,
    /// Whether the payment has been voided.
    #[serde(default)]
    pub voided: bool,
    /// Why the payment was voided.
    #[serde(default)]
    pub void_reason: Option<String>,
    /// When the payment was voided.
    #[serde(default)]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Sum of all allocations.
    #[must_use]
    pub fn allocated_total(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount_applied).sum()
    }

    /// Part of the payment not applied to any invoice (advance credit).
    #[must_use]
    pub fn unallocated(&self) -> Decimal {
        self.amount.amount - self.allocated_total()
    }
}

/// Payload submitted to the payment service to create a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    /// Who paid.
    pub payer_id: PayerId,
    /// Total amount and currency.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// External reference.
    pub reference: Option<String>,
    /// Advance or invoice payment.
    pub kind: PaymentKind,
    /// Allocations created together with the payment.
    pub allocations: Vec<AllocationPayload>,
}

/// Input for recording a payment, optionally settling one invoice.
#[derive(Debug, Clone)]
pub struct RecordPaymentInput {
    /// Who paid.
    pub payer_id: PayerId,
    /// Total amount and currency.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// External reference.
    pub reference: Option<String>,
    /// Invoice to settle; `None` records an advance payment.
    pub invoice_id: Option<InvoiceId>,
}

/// Result of voiding a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoidOutcome {
    /// The payment, now voided.
    pub payment: Payment,
    /// Invoices whose paid amounts were reversed.
    pub invoices: Vec<Invoice>,
}
