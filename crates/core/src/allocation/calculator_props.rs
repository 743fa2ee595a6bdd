//! Property-based tests for the allocation calculator.
//!
//! - Property 1: Proposal is min(balance, remaining) and never negative
//! - Property 2: Manual amounts stay within [0, balance_due]
//! - Property 3: OverAllocated iff the total exceeds the payment
//! - Property 4: Commit is a lossless projection

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use settle_shared::CandidateOrder;
use settle_shared::types::{Currency, InvoiceId, PayerId};
use uuid::Uuid;

use super::calculator::AllocationCalculator;
use super::error::AllocationError;
use super::types::{AllocationSet, PaymentKind};
use crate::invoice::{Invoice, InvoiceStatus};

/// Strategy to generate a positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate any amount, including negative and absurdly large ones.
fn any_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000_000_000i64..1_000_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a non-negative payment amount.
fn payment_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn make_invoice(payer: PayerId, seed: u128, total: Decimal, paid: Decimal) -> Invoice {
    let status = if paid.is_zero() {
        InvoiceStatus::Open
    } else {
        InvoiceStatus::Partial
    };
    Invoice {
        id: InvoiceId::from_uuid(Uuid::from_u128(seed)),
        number: format!("INV-{seed:05}"),
        payer_id: payer,
        currency: Currency::Usd,
        issue_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        due_date: None,
        total,
        paid,
        status,
    }
}

/// Strategy for an open invoice with a positive balance.
fn open_invoice(payer: PayerId) -> impl Strategy<Value = Invoice> {
    (any::<u128>(), positive_amount(), 0u32..100).prop_map(move |(seed, total, paid_pct)| {
        let paid = (total * Decimal::from(paid_pct) / Decimal::from(100)).round_dp(2);
        let paid = if paid >= total { Decimal::ZERO } else { paid };
        make_invoice(payer, seed, total, paid)
    })
}

/// Strategy for a list of distinct open invoices (1 to 8).
fn open_invoices(payer: PayerId) -> impl Strategy<Value = Vec<Invoice>> {
    prop::collection::vec(open_invoice(payer), 1..8).prop_map(|invoices| {
        let mut seen = HashSet::new();
        invoices
            .into_iter()
            .filter(|inv| seen.insert(inv.id))
            .collect()
    })
}

fn fixed_payer() -> PayerId {
    PayerId::from_uuid(Uuid::from_u128(42))
}

/// Builds a set by selecting every invoice, then overriding each amount.
fn build_set(invoices: &[Invoice], amounts: &[Decimal], payment: Decimal) -> AllocationSet {
    let mut set = AllocationSet::new(fixed_payer(), Currency::Usd);
    for invoice in invoices {
        set = AllocationCalculator::select_invoice(&set, invoice, payment).unwrap();
    }
    for (invoice, amount) in invoices.iter().zip(amounts) {
        set = AllocationCalculator::set_allocation_amount(&set, invoice.id, *amount).unwrap();
    }
    set
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Proposal bounds
    // =========================================================================

    /// *For any* balance B and remaining R, auto_allocate SHALL return
    /// min(B, R) when R > 0 and 0 otherwise.
    #[test]
    fn prop_auto_allocate_is_min_of_balance_and_remaining(
        invoice in open_invoice(fixed_payer()),
        remaining in any_amount(),
    ) {
        let proposed = AllocationCalculator::auto_allocate(&invoice, remaining);

        prop_assert!(proposed >= Decimal::ZERO);
        if remaining <= Decimal::ZERO {
            prop_assert_eq!(proposed, Decimal::ZERO);
        } else {
            prop_assert_eq!(proposed, invoice.balance_due().min(remaining));
        }
    }

    /// *For any* sequence of selections, no line SHALL exceed its balance
    /// and the proposals SHALL never exceed the payment in total.
    #[test]
    fn prop_sequential_selection_never_over_allocates(
        invoices in open_invoices(fixed_payer()),
        payment in payment_amount(),
    ) {
        let mut set = AllocationSet::new(fixed_payer(), Currency::Usd);
        for invoice in &invoices {
            set = AllocationCalculator::select_invoice(&set, invoice, payment).unwrap();
        }

        prop_assert!(set.total_applied() <= payment);
        for line in set.lines() {
            prop_assert!(line.amount() <= line.balance_due());
        }
    }

    // =========================================================================
    // Property 2: Clamping
    // =========================================================================

    /// *For any* requested amount, set_allocation_amount SHALL produce an
    /// amount within [0, balance_due].
    #[test]
    fn prop_set_amount_stays_within_balance(
        invoice in open_invoice(fixed_payer()),
        requested in any_amount(),
        payment in payment_amount(),
    ) {
        let set = AllocationCalculator::select_invoice(
            &AllocationSet::new(fixed_payer(), Currency::Usd),
            &invoice,
            payment,
        ).unwrap();
        let set = AllocationCalculator::set_allocation_amount(&set, invoice.id, requested).unwrap();
        let amount = set.get(invoice.id).unwrap().amount();

        prop_assert!(amount >= Decimal::ZERO);
        prop_assert!(amount <= invoice.balance_due());
        if requested >= Decimal::ZERO && requested <= invoice.balance_due() {
            prop_assert_eq!(amount, requested);
        }
    }

    // =========================================================================
    // Property 3: Over-allocation detection
    // =========================================================================

    /// *For any* set and non-negative payment, validate SHALL return
    /// OverAllocated exactly when the total exceeds the payment.
    #[test]
    fn prop_over_allocated_iff_total_exceeds_payment(
        invoices in open_invoices(fixed_payer()),
        amounts in prop::collection::vec(positive_amount(), 8),
        payment in payment_amount(),
    ) {
        let set = build_set(&invoices, &amounts, payment);
        let result = AllocationCalculator::validate(&set, payment, PaymentKind::WithInvoice);
        let over = matches!(result, Err(AllocationError::OverAllocated { .. }));

        prop_assert_eq!(over, set.total_applied() > payment);
        if let Ok(summary) = result {
            prop_assert_eq!(summary.total_applied + summary.residual, payment);
            prop_assert!(summary.residual >= Decimal::ZERO);
        }
    }

    // =========================================================================
    // Property 4: Commit projection
    // =========================================================================

    /// *For any* set, commit SHALL yield one entry per distinct invoice and
    /// preserve the total exactly.
    #[test]
    fn prop_commit_preserves_entries_and_sum(
        invoices in open_invoices(fixed_payer()),
        amounts in prop::collection::vec(positive_amount(), 8),
        payment in payment_amount(),
    ) {
        let set = build_set(&invoices, &amounts, payment);
        let payload = AllocationCalculator::commit(&set);

        prop_assert_eq!(payload.len(), set.len());
        let distinct: HashSet<InvoiceId> = payload.iter().map(|p| p.invoice_id).collect();
        prop_assert_eq!(distinct.len(), payload.len());

        let sum: Decimal = payload.iter().map(|p| p.amount_applied).sum();
        prop_assert_eq!(sum, set.total_applied());

        for entry in &payload {
            prop_assert_eq!(entry.amount_applied, set.get(entry.invoice_id).unwrap().amount());
        }
    }

    // =========================================================================
    // Candidate listing
    // =========================================================================

    /// *For any* snapshot, candidates SHALL all be payable invoices of the
    /// payer, and listing SHALL not depend on input order.
    #[test]
    fn prop_candidates_are_deterministic(
        invoices in open_invoices(fixed_payer()),
    ) {
        let forward = AllocationCalculator::list_candidate_invoices(
            &invoices, fixed_payer(), CandidateOrder::IssueDate,
        );
        let mut reversed_input = invoices.clone();
        reversed_input.reverse();
        let backward = AllocationCalculator::list_candidate_invoices(
            &reversed_input, fixed_payer(), CandidateOrder::IssueDate,
        );

        prop_assert_eq!(&forward, &backward);
        for invoice in &forward {
            prop_assert!(invoice.is_payable());
            prop_assert_eq!(invoice.payer_id, fixed_payer());
        }
    }

    /// *For any* snapshot, refreshing a set against the same snapshot SHALL
    /// leave it unchanged.
    #[test]
    fn prop_refresh_with_same_snapshot_is_identity(
        invoices in open_invoices(fixed_payer()),
        payment in payment_amount(),
    ) {
        let set = AllocationCalculator::allocate_oldest_first(
            fixed_payer(), Currency::Usd, &invoices, payment,
        ).unwrap();
        let refreshed = AllocationCalculator::refresh_balances(&set, &invoices);
        prop_assert_eq!(refreshed, set);
    }
}
