use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewSubscriber, SubscriberPatch, WebhookSubscriber},
    traits::{SubscriberStore, SubscriberStoreError},
};

/// CRUD access to the webhook subscriber registry.
pub struct SubscriberApi<S> {
    store: S,
}

impl<S> Debug for SubscriberApi<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubscriberApi")
    }
}

impl<S> SubscriberApi<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> SubscriberApi<S>
where S: SubscriberStore
{
    pub async fn subscribers(&self) -> Result<Vec<WebhookSubscriber>, SubscriberStoreError> {
        self.store.fetch_subscribers().await
    }

    pub async fn subscriber(&self, id: i64) -> Result<Option<WebhookSubscriber>, SubscriberStoreError> {
        self.store.fetch_subscriber(id).await
    }

    pub async fn register(&self, subscriber: NewSubscriber) -> Result<WebhookSubscriber, SubscriberStoreError> {
        let subscriber = self.store.create_subscriber(subscriber).await?;
        info!("📡️ Webhook subscriber #{} [{}] registered for {}", subscriber.id, subscriber.name, subscriber.url);
        Ok(subscriber)
    }

    pub async fn update(
        &self,
        id: i64,
        patch: SubscriberPatch,
    ) -> Result<Option<WebhookSubscriber>, SubscriberStoreError> {
        let result = self.store.update_subscriber(id, patch).await?;
        if result.is_some() {
            debug!("📡️ Webhook subscriber #{id} updated");
        }
        Ok(result)
    }

    pub async fn remove(&self, id: i64) -> Result<bool, SubscriberStoreError> {
        let deleted = self.store.delete_subscriber(id).await?;
        if deleted {
            info!("📡️ Webhook subscriber #{id} deleted");
        }
        Ok(deleted)
    }
}
