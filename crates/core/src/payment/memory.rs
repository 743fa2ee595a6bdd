//! In-memory payment gateway.
//!
//! Holds invoices and payments behind a mutex and enforces the same rules a
//! remote service would: allocations must fit the payment and the invoice
//! balances, belong to the payer, and a voided payment is frozen.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rust_decimal::Decimal;
use settle_shared::types::{Currency, PayerId, PaymentId};
use settle_shared::{AppError, AppResult};
use tracing::{debug, info};

use crate::allocation::{AllocationPayload, PaymentKind};
use crate::invoice::{Invoice, SettlementService};
use crate::payment::gateway::PaymentGateway;
use crate::payment::types::{NewPayment, Payment};
use crate::payment::void::VoidService;

#[derive(Debug, Default)]
struct Ledger {
    invoices: Vec<Invoice>,
    payments: HashMap<PaymentId, Payment>,
}

impl Ledger {
    fn write_back(&mut self, updated: Vec<Invoice>) {
        for invoice in updated {
            if let Some(slot) = self.invoices.iter_mut().find(|inv| inv.id == invoice.id) {
                *slot = invoice;
            }
        }
    }

    fn payment(&self, payment_id: PaymentId) -> AppResult<Payment> {
        self.payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Payment {payment_id} not found")))
    }

    /// Every allocated invoice must belong to the payer and share the currency.
    fn check_ownership(
        &self,
        payer_id: PayerId,
        currency: Currency,
        allocations: &[AllocationPayload],
    ) -> AppResult<()> {
        for allocation in allocations {
            let Some(invoice) = self
                .invoices
                .iter()
                .find(|inv| inv.id == allocation.invoice_id)
            else {
                continue;
            };
            if invoice.payer_id != payer_id {
                return Err(AppError::BusinessRule(format!(
                    "Invoice {} does not belong to payer {payer_id}",
                    invoice.number
                )));
            }
            if invoice.currency != currency {
                return Err(AppError::BusinessRule(format!(
                    "Invoice {} is in {}, payment is in {currency}",
                    invoice.number, invoice.currency
                )));
            }
        }
        Ok(())
    }
}

/// Payment gateway backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    ledger: Mutex<Ledger>,
}

impl InMemoryGateway {
    /// Create a gateway seeded with invoices and existing payments.
    #[must_use]
    pub fn new(invoices: Vec<Invoice>, payments: Vec<Payment>) -> Self {
        let payments = payments.into_iter().map(|p| (p.id, p)).collect();
        Self {
            ledger: Mutex::new(Ledger { invoices, payments }),
        }
    }

    /// Snapshot of every invoice, in seeding order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the ledger lock is poisoned.
    pub fn invoices(&self) -> AppResult<Vec<Invoice>> {
        Ok(self.lock()?.invoices.clone())
    }

    /// Snapshot of every payment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the ledger lock is poisoned.
    pub fn payments(&self) -> AppResult<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.lock()?.payments.values().cloned().collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(payments)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Ledger>> {
        self.ledger
            .lock()
            .map_err(|_| AppError::Internal("payment ledger lock poisoned".to_string()))
    }
}

fn allocated_sum(allocations: &[AllocationPayload]) -> Decimal {
    allocations.iter().map(|a| a.amount_applied).sum()
}

impl PaymentGateway for InMemoryGateway {
    async fn fetch_open_invoices(&self, payer_id: PayerId) -> AppResult<Vec<Invoice>> {
        let ledger = self.lock()?;
        let invoices: Vec<Invoice> = ledger
            .invoices
            .iter()
            .filter(|inv| inv.payer_id == payer_id && inv.status.accepts_payment())
            .cloned()
            .collect();
        debug!(payer_id = %payer_id, count = invoices.len(), "Fetched open invoices");
        Ok(invoices)
    }

    async fn fetch_payment(&self, payment_id: PaymentId) -> AppResult<Payment> {
        self.lock()?.payment(payment_id)
    }

    async fn submit_payment(&self, payload: NewPayment) -> AppResult<Payment> {
        if !payload.amount.is_positive() {
            return Err(AppError::Validation(format!(
                "Payment amount must be positive, got {}",
                payload.amount
            )));
        }
        let allocated = allocated_sum(&payload.allocations);
        if allocated > payload.amount.amount {
            return Err(AppError::BusinessRule(format!(
                "Allocated total {allocated} exceeds payment amount {}",
                payload.amount.amount
            )));
        }

        let mut ledger = self.lock()?;
        ledger.check_ownership(payload.payer_id, payload.amount.currency, &payload.allocations)?;
        let updated = SettlementService::apply_allocations(&ledger.invoices, &payload.allocations)?;
        ledger.write_back(updated);

        let payment = Payment {
            id: PaymentId::new(),
            payer_id: payload.payer_id,
            amount: payload.amount,
            method: payload.method,
            reference: payload.reference,
            kind: payload.kind,
            allocations: payload.allocations,
            created_at: Utc::now(),
            voided: false,
            void_reason: None,
            voided_at: None,
        };
        ledger.payments.insert(payment.id, payment.clone());

        info!(
            payment_id = %payment.id,
            payer_id = %payment.payer_id,
            amount = %payment.amount,
            allocations = payment.allocations.len(),
            "Payment recorded"
        );
        Ok(payment)
    }

    async fn submit_allocation(
        &self,
        payment_id: PaymentId,
        allocations: Vec<AllocationPayload>,
    ) -> AppResult<Payment> {
        let mut ledger = self.lock()?;
        let mut payment = ledger.payment(payment_id)?;
        if payment.voided {
            return Err(AppError::Conflict(format!("Payment {payment_id} is voided")));
        }

        let allocated = allocated_sum(&allocations);
        if allocated > payment.unallocated() {
            return Err(AppError::BusinessRule(format!(
                "Allocated total {allocated} exceeds unallocated amount {}",
                payment.unallocated()
            )));
        }

        ledger.check_ownership(payment.payer_id, payment.amount.currency, &allocations)?;
        let updated = SettlementService::apply_allocations(&ledger.invoices, &allocations)?;
        ledger.write_back(updated);

        payment.allocations.extend(allocations);
        if !payment.allocations.is_empty() {
            payment.kind = PaymentKind::WithInvoice;
        }
        ledger.payments.insert(payment.id, payment.clone());

        info!(
            payment_id = %payment.id,
            allocated = %allocated,
            unallocated = %payment.unallocated(),
            "Allocation applied"
        );
        Ok(payment)
    }

    async fn void_payment(&self, payment_id: PaymentId, reason: String) -> AppResult<Payment> {
        let mut ledger = self.lock()?;
        let payment = ledger.payment(payment_id)?;
        let outcome = VoidService::void(&payment, &ledger.invoices, &reason, Utc::now())?;

        ledger.write_back(outcome.invoices);
        ledger
            .payments
            .insert(outcome.payment.id, outcome.payment.clone());

        info!(payment_id = %payment_id, reason = %reason, "Payment voided");
        Ok(outcome.payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::PaymentKind;
    use crate::invoice::InvoiceStatus;
    use crate::payment::types::PaymentMethod;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use settle_shared::types::{InvoiceId, Money};

    fn invoice(payer: PayerId, number: &str, total: Decimal) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            number: number.to_string(),
            payer_id: payer,
            currency: Currency::Usd,
            issue_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            due_date: None,
            total,
            paid: Decimal::ZERO,
            status: InvoiceStatus::Open,
        }
    }

    fn new_payment(
        payer: PayerId,
        amount: Decimal,
        allocations: Vec<AllocationPayload>,
    ) -> NewPayment {
        NewPayment {
            payer_id: payer,
            amount: Money::new(amount, Currency::Usd),
            method: PaymentMethod::Cash,
            reference: None,
            kind: PaymentKind::WithInvoice,
            allocations,
        }
    }

    fn alloc(invoice: &Invoice, amount: Decimal) -> AllocationPayload {
        AllocationPayload {
            invoice_id: invoice.id,
            amount_applied: amount,
        }
    }

    #[tokio::test]
    async fn test_fetch_open_invoices_filters_payer_and_status() {
        let payer = PayerId::new();
        let open = invoice(payer, "INV-1", dec!(10));
        let mut paid = invoice(payer, "INV-2", dec!(10));
        paid.paid = dec!(10);
        paid.status = InvoiceStatus::Paid;
        let other = invoice(PayerId::new(), "INV-3", dec!(10));
        let gateway = InMemoryGateway::new(vec![open.clone(), paid, other], vec![]);

        let fetched = gateway.fetch_open_invoices(payer).await.unwrap();
        assert_eq!(fetched, vec![open]);
    }

    #[tokio::test]
    async fn test_submit_payment_applies_allocations() {
        let payer = PayerId::new();
        let a = invoice(payer, "INV-1", dec!(40.00));
        let gateway = InMemoryGateway::new(vec![a.clone()], vec![]);

        let payment = gateway
            .submit_payment(new_payment(payer, dec!(40.00), vec![alloc(&a, dec!(40.00))]))
            .await
            .unwrap();

        let invoices = gateway.invoices().unwrap();
        assert_eq!(invoices[0].paid, dec!(40.00));
        assert_eq!(invoices[0].status, InvoiceStatus::Paid);
        assert_eq!(gateway.fetch_payment(payment.id).await.unwrap(), payment);
    }

    #[tokio::test]
    async fn test_submit_payment_rejects_over_allocation() {
        let payer = PayerId::new();
        let a = invoice(payer, "INV-1", dec!(40.00));
        let gateway = InMemoryGateway::new(vec![a.clone()], vec![]);

        let err = gateway
            .submit_payment(new_payment(payer, dec!(30.00), vec![alloc(&a, dec!(40.00))]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(gateway.invoices().unwrap()[0].paid, Decimal::ZERO);
        assert!(gateway.payments().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_payment_rejects_other_payers_invoice() {
        let payer = PayerId::new();
        let foreign = invoice(PayerId::new(), "INV-9", dec!(40.00));
        let gateway = InMemoryGateway::new(vec![foreign.clone()], vec![]);

        let err = gateway
            .submit_payment(new_payment(payer, dec!(40.00), vec![alloc(&foreign, dec!(10.00))]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn test_submit_payment_with_unknown_invoice_is_not_found() {
        let payer = PayerId::new();
        let ghost = invoice(payer, "INV-0", dec!(40.00));
        let gateway = InMemoryGateway::new(vec![], vec![]);

        let err = gateway
            .submit_payment(new_payment(payer, dec!(40.00), vec![alloc(&ghost, dec!(10.00))]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submit_allocation_uses_unallocated_amount() {
        let payer = PayerId::new();
        let a = invoice(payer, "INV-1", dec!(80.00));
        let gateway = InMemoryGateway::new(vec![a.clone()], vec![]);
        let mut advance = new_payment(payer, dec!(50.00), vec![]);
        advance.kind = PaymentKind::Advance;
        let payment = gateway.submit_payment(advance).await.unwrap();

        let updated = gateway
            .submit_allocation(payment.id, vec![alloc(&a, dec!(30.00))])
            .await
            .unwrap();
        assert_eq!(updated.unallocated(), dec!(20.00));
        assert_eq!(updated.kind, PaymentKind::WithInvoice);

        let err = gateway
            .submit_allocation(payment.id, vec![alloc(&a, dec!(25.00))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert_eq!(gateway.invoices().unwrap()[0].paid, dec!(30.00));
    }

    #[tokio::test]
    async fn test_void_payment_restores_invoices_once() {
        let payer = PayerId::new();
        let a = invoice(payer, "INV-1", dec!(40.00));
        let b = invoice(payer, "INV-2", dec!(100.00));
        let gateway = InMemoryGateway::new(vec![a.clone(), b.clone()], vec![]);
        let payment = gateway
            .submit_payment(new_payment(
                payer,
                dec!(100.00),
                vec![alloc(&a, dec!(40.00)), alloc(&b, dec!(60.00))],
            ))
            .await
            .unwrap();

        let voided = gateway
            .void_payment(payment.id, "Bounced".to_string())
            .await
            .unwrap();
        assert!(voided.voided);

        let invoices = gateway.invoices().unwrap();
        assert_eq!(invoices[0].balance_due(), dec!(40.00));
        assert_eq!(invoices[1].balance_due(), dec!(100.00));

        let err = gateway
            .void_payment(payment.id, "Again".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(gateway.invoices().unwrap()[1].balance_due(), dec!(100.00));
    }

    #[tokio::test]
    async fn test_voided_payment_rejects_allocation() {
        let payer = PayerId::new();
        let a = invoice(payer, "INV-1", dec!(40.00));
        let gateway = InMemoryGateway::new(vec![a.clone()], vec![]);
        let payment = gateway
            .submit_payment(new_payment(payer, dec!(40.00), vec![]))
            .await
            .unwrap();
        gateway
            .void_payment(payment.id, "Typo".to_string())
            .await
            .unwrap();

        let err = gateway
            .submit_allocation(payment.id, vec![alloc(&a, dec!(10.00))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_fetch_unknown_payment_is_not_found() {
        let gateway = InMemoryGateway::default();
        let err = gateway.fetch_payment(PaymentId::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
