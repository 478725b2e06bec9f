use thiserror::Error;

use crate::db_types::{ApprovedPaymentEvent, NewPendingPayment, Payment, User};

/// The result of applying an approved-payment event to the ledger.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The payment was recorded and the user's subscription extended, in one transaction.
    Reconciled { payment: Payment, user: User },
    /// A payment with this `gateway_payment_id` already exists. Nothing was written. This is the idempotency
    /// short-circuit, not an error, and holds under concurrent duplicate deliveries.
    AlreadyProcessed,
    /// The referenced user does not exist. Nothing was written. The notification is permanently unreconcilable and
    /// the caller is expected to acknowledge it anyway.
    UserNotFound,
}

/// Storage contract for the payment ledger and user subscription state.
///
/// Cross-request coordination is entirely the backend's job: implementations rely on the unique constraint on
/// `gateway_payment_id` and transactional writes rather than any in-memory locking.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Applies an approved-payment event. In a single atomic unit:
    /// * returns [`ReconcileOutcome::AlreadyProcessed`] if a payment with the event's `gateway_payment_id` exists,
    ///   including when a concurrent duplicate wins the insert race;
    /// * returns [`ReconcileOutcome::UserNotFound`] if the referenced user is absent;
    /// * otherwise inserts a `completed` payment record and moves the user's `subscription_ends_at` forward, with
    ///   both writes committing together or not at all.
    async fn reconcile_approved_payment(
        &self,
        event: &ApprovedPaymentEvent,
        currency: &str,
    ) -> Result<ReconcileOutcome, PaymentGatewayError>;

    /// Creates a `pending` payment record for a purchase the user has just initiated.
    async fn create_pending_payment(&self, payment: NewPendingPayment) -> Result<Payment, PaymentGatewayError>;

    /// Records the gateway's order reference against a pending payment.
    async fn set_gateway_order_id(&self, payment_id: i64, gateway_order_id: &str) -> Result<(), PaymentGatewayError>;

    /// All payments for the user, newest first.
    async fn payment_history(&self, user_id: &str) -> Result<Vec<Payment>, PaymentGatewayError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, PaymentGatewayError>;

    /// Administrative subscription extension: applies the subscription clock to the user's current expiry and
    /// persists the result. Returns the updated user, or `None` if the user does not exist.
    async fn extend_user_subscription(&self, user_id: &str, days: i64) -> Result<Option<User>, PaymentGatewayError>;
}

#[derive(Debug, Error)]
pub enum PaymentGatewayError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Payment record #{0} was not found")]
    PaymentNotFound(i64),
}
