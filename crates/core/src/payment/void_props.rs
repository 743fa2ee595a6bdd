//! Property-based tests for payment voids.
//!
//! - Property 8: Voiding restores every allocated invoice's balance
//! - Property 9: A payment is voided at most once

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use settle_shared::types::{Currency, InvoiceId, Money, PayerId, PaymentId};
use uuid::Uuid;

use super::error::PaymentError;
use super::types::{Payment, PaymentMethod};
use super::void::VoidService;
use crate::allocation::{AllocationCalculator, PaymentKind};
use crate::invoice::{Invoice, InvoiceStatus, SettlementService};

/// Strategy to generate a positive amount (0.01 to 100,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn payer() -> PayerId {
    PayerId::from_uuid(Uuid::from_u128(7))
}

/// Strategy for 1 to 6 distinct open invoices with no payment yet.
fn open_invoices() -> impl Strategy<Value = Vec<Invoice>> {
    prop::collection::vec(positive_amount(), 1..6).prop_map(|totals| {
        totals
            .into_iter()
            .enumerate()
            .map(|(i, total)| Invoice {
                id: InvoiceId::from_uuid(Uuid::from_u128(1000 + i as u128)),
                number: format!("INV-{i:04}"),
                payer_id: payer(),
                currency: Currency::Usd,
                issue_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                due_date: None,
                total,
                paid: Decimal::ZERO,
                status: InvoiceStatus::Open,
            })
            .collect()
    })
}

/// Allocates `amount` oldest-first and applies it, returning the paid state.
fn pay(invoices: &[Invoice], amount: Decimal) -> (Payment, Vec<Invoice>) {
    let set =
        AllocationCalculator::allocate_oldest_first(payer(), Currency::Usd, invoices, amount)
            .unwrap();
    let allocations = AllocationCalculator::commit(&set);
    let applied = SettlementService::apply_allocations(invoices, &allocations).unwrap();

    let mut after = invoices.to_vec();
    for updated in applied {
        if let Some(slot) = after.iter_mut().find(|inv| inv.id == updated.id) {
            *slot = updated;
        }
    }

    let payment = Payment {
        id: PaymentId::from_uuid(Uuid::from_u128(99)),
        payer_id: payer(),
        amount: Money::new(amount, Currency::Usd),
        method: PaymentMethod::Transfer,
        reference: None,
        kind: PaymentKind::WithInvoice,
        allocations,
        created_at: Utc::now(),
        voided: false,
        void_reason: None,
        voided_at: None,
    };
    (payment, after)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 8: Void restores balances
    // =========================================================================

    /// *For any* payment allocated across invoices, voiding it SHALL restore
    /// each touched invoice's balance to what it was before the payment.
    #[test]
    fn prop_void_restores_balances(
        invoices in open_invoices(),
        amount in positive_amount(),
    ) {
        let (payment, after) = pay(&invoices, amount);
        let outcome = VoidService::void(&payment, &after, "Bounced", Utc::now()).unwrap();

        prop_assert_eq!(outcome.invoices.len(), payment.allocations.len());
        for restored in &outcome.invoices {
            let before = invoices.iter().find(|inv| inv.id == restored.id).unwrap();
            prop_assert_eq!(restored.balance_due(), before.balance_due());
            prop_assert_eq!(restored.paid, before.paid);
            prop_assert_eq!(restored.status, InvoiceStatus::Open);
        }
    }

    // =========================================================================
    // Property 9: Void is not repeatable
    // =========================================================================

    /// *For any* voided payment, a second void SHALL fail with AlreadyVoided
    /// regardless of the reason supplied.
    #[test]
    fn prop_second_void_is_rejected(
        invoices in open_invoices(),
        amount in positive_amount(),
        reason in "[a-zA-Z ]{0,20}",
    ) {
        let (payment, after) = pay(&invoices, amount);
        let first = VoidService::void(&payment, &after, "Bounced", Utc::now()).unwrap();

        let second = VoidService::void(&first.payment, &first.invoices, &reason, Utc::now());
        prop_assert_eq!(second, Err(PaymentError::AlreadyVoided(payment.id)));
    }
}
