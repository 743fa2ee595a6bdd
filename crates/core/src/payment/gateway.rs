//! Remote payment and invoice services.

use settle_shared::AppResult;
use settle_shared::types::{PayerId, PaymentId};

use crate::allocation::AllocationPayload;
use crate::invoice::Invoice;
use crate::payment::types::{NewPayment, Payment};

/// Gateway to the services that own invoices and payments.
///
/// Implementations perform the actual I/O. The service layer only talks to
/// this trait, so tests and the CLI can run against `InMemoryGateway`.
pub trait PaymentGateway: Send + Sync {
    /// Fetch a payer's invoices that can still receive payment.
    fn fetch_open_invoices(
        &self,
        payer_id: PayerId,
    ) -> impl std::future::Future<Output = AppResult<Vec<Invoice>>> + Send;

    /// Fetch a payment by ID.
    fn fetch_payment(
        &self,
        payment_id: PaymentId,
    ) -> impl std::future::Future<Output = AppResult<Payment>> + Send;

    /// Create a payment, applying any allocations it carries.
    fn submit_payment(
        &self,
        payload: NewPayment,
    ) -> impl std::future::Future<Output = AppResult<Payment>> + Send;

    /// Apply further allocations to an existing payment.
    fn submit_allocation(
        &self,
        payment_id: PaymentId,
        allocations: Vec<AllocationPayload>,
    ) -> impl std::future::Future<Output = AppResult<Payment>> + Send;

    /// Void a payment, reversing its allocations.
    fn void_payment(
        &self,
        payment_id: PaymentId,
        reason: String,
    ) -> impl std::future::Future<Output = AppResult<Payment>> + Send;
}
