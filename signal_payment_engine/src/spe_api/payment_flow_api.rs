use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ApprovedPaymentEvent, NewPendingPayment, Payment, User},
    events::{EventProducers, PaymentCompletedEvent},
    plans::Plan,
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconcileOutcome},
};

/// `PaymentFlowApi` is the primary API for handling payment flows in response to gateway notifications and
/// user-initiated purchases.
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentFlowApi<B>
where B: PaymentGatewayDatabase
{
    /// Applies a normalized approved-payment event: records the payment and extends the user's subscription in one
    /// transaction, then fires the payment-completed hook.
    ///
    /// Duplicate notifications and unknown users are reported in the outcome rather than as errors; the
    /// notification boundary acknowledges them without retrying.
    pub async fn reconcile_approved_payment(
        &self,
        event: &ApprovedPaymentEvent,
        currency: &str,
    ) -> Result<ReconcileOutcome, PaymentGatewayError> {
        let outcome = self.db.reconcile_approved_payment(event, currency).await?;
        match &outcome {
            ReconcileOutcome::Reconciled { payment, user } => {
                info!(
                    "🔄️💰️ Payment [{}] from [{}] reconciled for user [{}]",
                    event.gateway_payment_id, event.gateway, user.id
                );
                self.call_payment_completed_hook(payment, user).await;
            },
            ReconcileOutcome::AlreadyProcessed => {
                warn!("🔄️💰️ Ignoring duplicate notification for payment [{}]", event.gateway_payment_id);
            },
            ReconcileOutcome::UserNotFound => {
                warn!(
                    "🔄️💰️ Payment [{}] references unknown user [{}]. The payment has NOT been recorded.",
                    event.gateway_payment_id, event.user_id
                );
            },
        }
        Ok(outcome)
    }

    async fn call_payment_completed_hook(&self, payment: &Payment, user: &User) {
        for emitter in &self.producers.payment_completed_producer {
            debug!("🔄️💰️ Notifying payment completed hook subscribers");
            let event = PaymentCompletedEvent::new(payment.clone(), user.clone());
            emitter.publish_event(event).await;
        }
    }

    /// Creates a pending payment record for the given plan, before the user is redirected to the gateway checkout.
    pub async fn create_payment_for_plan(
        &self,
        user_id: &str,
        plan: &Plan,
        currency: &str,
        gateway: &str,
    ) -> Result<Payment, PaymentGatewayError> {
        let payment = NewPendingPayment {
            user_id: user_id.to_string(),
            amount: plan.amount,
            currency: currency.to_string(),
            gateway: gateway.to_string(),
            subscription_days: plan.days,
        };
        let payment = self.db.create_pending_payment(payment).await?;
        debug!("🔄️💰️ Pending payment #{} ({}) created for user [{user_id}]", payment.id, plan.code);
        Ok(payment)
    }

    /// Records the gateway's checkout/order reference against a pending payment.
    pub async fn set_gateway_order_id(&self, payment_id: i64, order_id: &str) -> Result<(), PaymentGatewayError> {
        self.db.set_gateway_order_id(payment_id, order_id).await
    }

    /// All payments for the user, newest first.
    pub async fn payment_history(&self, user_id: &str) -> Result<Vec<Payment>, PaymentGatewayError> {
        self.db.payment_history(user_id).await
    }

    pub async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, PaymentGatewayError> {
        self.db.fetch_user(user_id).await
    }

    /// Administrative subscription extension. Uses the same clock rules as reconciliation, but does not create a
    /// payment record or fire hooks.
    pub async fn extend_subscription(&self, user_id: &str, days: i64) -> Result<Option<User>, PaymentGatewayError> {
        let result = self.db.extend_user_subscription(user_id, days).await?;
        if let Some(user) = &result {
            info!("🔄️💰️ Subscription for user [{}] extended by {days} day(s) by an administrator", user.id);
        }
        Ok(result)
    }
}
