use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewSubscriber, SubscriberPatch, WebhookSubscriber};

/// Storage contract for the webhook subscriber registry.
///
/// The dispatcher only ever calls [`SubscriberStore::subscribers_for_event`] and
/// [`SubscriberStore::record_delivery_attempt`]; the rest is the administrative CRUD surface. Statistics updates
/// touch a single subscriber row each and may interleave freely across concurrent dispatch passes.
#[allow(async_fn_in_trait)]
pub trait SubscriberStore: Clone {
    /// Active subscribers whose event set contains `event`.
    async fn subscribers_for_event(&self, event: &str) -> Result<Vec<WebhookSubscriber>, SubscriberStoreError>;

    /// All subscribers, newest first.
    async fn fetch_subscribers(&self) -> Result<Vec<WebhookSubscriber>, SubscriberStoreError>;

    async fn fetch_subscriber(&self, id: i64) -> Result<Option<WebhookSubscriber>, SubscriberStoreError>;

    async fn create_subscriber(&self, subscriber: NewSubscriber) -> Result<WebhookSubscriber, SubscriberStoreError>;

    /// Applies the patch field by field. Returns the updated subscriber, or `None` if the id does not exist.
    async fn update_subscriber(
        &self,
        id: i64,
        patch: SubscriberPatch,
    ) -> Result<Option<WebhookSubscriber>, SubscriberStoreError>;

    /// Hard delete. Returns `false` if the id did not exist.
    async fn delete_subscriber(&self, id: i64) -> Result<bool, SubscriberStoreError>;

    /// Records one delivery attempt against the subscriber's statistics: sets `last_triggered_at`, increments
    /// `total_calls`, and increments `failed_calls` when `failed` is set. Called exactly once per attempt.
    async fn record_delivery_attempt(
        &self,
        id: i64,
        failed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), SubscriberStoreError>;
}

#[derive(Debug, Error)]
pub enum SubscriberStoreError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}
