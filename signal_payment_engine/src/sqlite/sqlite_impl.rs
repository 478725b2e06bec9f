//! `SqliteDatabase` is the concrete storage backend for the payment engine.
//!
//! It implements both [`PaymentGatewayDatabase`] (payment ledger and subscription state) and [`SubscriberStore`]
//! (the webhook subscriber registry) on top of a SQLite connection pool.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{create_schema, new_pool, payments, subscribers, users};
use crate::{
    db_types::{ApprovedPaymentEvent, NewPendingPayment, NewSubscriber, Payment, SubscriberPatch, User,
        WebhookSubscriber},
    subscription::extend_subscription,
    traits::{PaymentGatewayDatabase, PaymentGatewayError, ReconcileOutcome, SubscriberStore, SubscriberStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url` and bootstraps the schema if needed.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        create_schema(&pool).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates a user record. User provisioning is owned by an external collaborator in production; this is for
    /// tests and tooling.
    pub async fn create_user(&self, id: &str, email: &str, name: &str, role: &str) -> Result<User, sqlx::Error> {
        // Writes that use RETURNING go through an explicit commit. The returned row is surfaced before the implicit
        // transaction settles, and until it does, the row is not guaranteed visible to the next pooled connection.
        let mut tx = self.pool.begin().await?;
        let user = users::insert_user(id, email, name, role, &mut tx).await?;
        tx.commit().await?;
        Ok(user)
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Applies an approved-payment event in a single transaction.
    ///
    /// The up-front existence checks catch the common duplicate delivery and unknown users cheaply, outside the
    /// transaction. The unique constraint on `gateway_payment_id` is what actually guarantees exactly-once
    /// application when duplicates race, so a unique-violation on insert is folded into `AlreadyProcessed` rather
    /// than surfaced as an error.
    async fn reconcile_approved_payment(
        &self,
        event: &ApprovedPaymentEvent,
        currency: &str,
    ) -> Result<ReconcileOutcome, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        if payments::fetch_by_gateway_payment_id(&event.gateway_payment_id, &mut conn).await?.is_some() {
            debug!("🗃️ Payment [{}] has already been processed", event.gateway_payment_id);
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }
        if users::fetch_user(&event.user_id, &mut conn).await?.is_none() {
            warn!("🗃️ Payment [{}] references unknown user [{}]", event.gateway_payment_id, event.user_id);
            return Ok(ReconcileOutcome::UserNotFound);
        }
        drop(conn);
        // The insert must be the transaction's first statement. A read would pin a snapshot, and under WAL the
        // later write upgrade fails with a busy error whenever a racing duplicate commits in between; writing first
        // takes the write lock immediately and the loser sees a plain unique violation instead.
        let mut tx = self.pool.begin().await?;
        let payment = match payments::insert_completed(event, currency, &mut tx).await {
            Ok(payment) => payment,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                debug!("🗃️ Payment [{}] lost an insert race to a concurrent duplicate", event.gateway_payment_id);
                return Ok(ReconcileOutcome::AlreadyProcessed);
            },
            Err(e) => return Err(e.into()),
        };
        let Some(user) = users::fetch_user(&event.user_id, &mut tx).await? else {
            tx.rollback().await?;
            warn!("🗃️ User [{}] disappeared while reconciling payment [{}]", event.user_id, event.gateway_payment_id);
            return Ok(ReconcileOutcome::UserNotFound);
        };
        let new_end = extend_subscription(user.subscription_ends_at, event.subscription_days);
        let user = users::set_subscription_end(&event.user_id, new_end, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Payment [{}] reconciled. Subscription for user [{}] now ends at {new_end}",
            event.gateway_payment_id, user.id
        );
        Ok(ReconcileOutcome::Reconciled { payment, user })
    }

    async fn create_pending_payment(&self, payment: NewPendingPayment) -> Result<Payment, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::insert_pending(payment, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn set_gateway_order_id(&self, payment_id: i64, gateway_order_id: &str) -> Result<(), PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        payments::set_gateway_order_id(payment_id, gateway_order_id, &mut conn).await
    }

    async fn payment_history(&self, user_id: &str) -> Result<Vec<Payment>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::history_for_user(user_id, &mut conn).await?)
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(user_id, &mut conn).await?)
    }

    async fn extend_user_subscription(&self, user_id: &str, days: i64) -> Result<Option<User>, PaymentGatewayError> {
        let mut tx = self.pool.begin().await?;
        let Some(user) = users::fetch_user(user_id, &mut tx).await? else {
            return Ok(None);
        };
        let new_end = extend_subscription(user.subscription_ends_at, days);
        let user = users::set_subscription_end(user_id, new_end, &mut tx).await?;
        tx.commit().await?;
        Ok(Some(user))
    }
}

impl SubscriberStore for SqliteDatabase {
    async fn subscribers_for_event(&self, event: &str) -> Result<Vec<WebhookSubscriber>, SubscriberStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscribers::active_for_event(event, &mut conn).await?)
    }

    async fn fetch_subscribers(&self) -> Result<Vec<WebhookSubscriber>, SubscriberStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscribers::fetch_all(&mut conn).await?)
    }

    async fn fetch_subscriber(&self, id: i64) -> Result<Option<WebhookSubscriber>, SubscriberStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscribers::fetch_by_id(id, &mut conn).await?)
    }

    async fn create_subscriber(&self, subscriber: NewSubscriber) -> Result<WebhookSubscriber, SubscriberStoreError> {
        let mut tx = self.pool.begin().await?;
        let subscriber = subscribers::insert(subscriber, &mut tx).await?;
        tx.commit().await?;
        Ok(subscriber)
    }

    async fn update_subscriber(
        &self,
        id: i64,
        patch: SubscriberPatch,
    ) -> Result<Option<WebhookSubscriber>, SubscriberStoreError> {
        let mut tx = self.pool.begin().await?;
        let subscriber = subscribers::update(id, patch, &mut tx).await?;
        tx.commit().await?;
        Ok(subscriber)
    }

    async fn delete_subscriber(&self, id: i64) -> Result<bool, SubscriberStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscribers::delete(id, &mut conn).await?)
    }

    async fn record_delivery_attempt(
        &self,
        id: i64,
        failed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), SubscriberStoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(subscribers::record_attempt(id, failed, at, &mut conn).await?)
    }
}
