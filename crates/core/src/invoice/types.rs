//! Invoice domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settle_shared::types::{Currency, InvoiceId, PayerId};
use std::fmt;

/// Invoice status in the billing lifecycle.
///
/// The valid transitions are:
/// - Draft → Open (issue, handled upstream)
/// - Draft | Open | Partial → Partial (part of the balance paid)
/// - Draft | Open | Partial → Paid (balance reaches zero)
/// - Partial | Paid → Open | Partial (payment reversed)
/// - any non-paid state → Void (cancellation, handled upstream)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice is being drafted.
    Draft,
    /// Invoice is issued and nothing has been paid.
    Open,
    /// Invoice has been paid in part.
    Partial,
    /// Invoice has been paid in full.
    Paid,
    /// Invoice has been cancelled.
    Void,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }

    /// Returns true if further payment may be applied in this status.
    #[must_use]
    pub fn accepts_payment(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if no further allocation is permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Void)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Consumer-side view of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice identifier.
    pub id: InvoiceId,
    /// Human-facing invoice number (e.g. "INV-0042").
    pub number: String,
    /// The payer the invoice is billed to.
    pub payer_id: PayerId,
    /// Invoice currency.
    pub currency: Currency,
    /// Date the invoice was issued.
    pub issue_date: NaiveDate,
    /// Date payment is due, if any.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Invoice grand total.
    pub total: Decimal,
    /// Amount already paid.
    #[serde(default)]
    pub paid: Decimal,
    /// Current status.
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Outstanding balance, never negative.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        (self.total - self.paid).max(Decimal::ZERO)
    }

    /// Returns true if the invoice can receive an allocation right now.
    #[must_use]
    pub fn is_payable(&self) -> bool {
        self.status.accepts_payment() && self.balance_due() > Decimal::ZERO
    }
}
