//! # Outbound webhook dispatcher
//!
//! Fans an event out to every active subscriber that listens to it. Each delivery is an independent HTTP POST with
//! its own timeout, so one slow endpoint never delays the others. There is no retry queue; a failed attempt is
//! recorded against the subscriber's stats and the caller gets a [`DeliveryReport`] per attempt.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::*;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    db_types::WebhookSubscriber,
    signature::sign_payload,
    traits::{SubscriberStore, SubscriberStoreError},
};

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Per-attempt timeout covering connect, send and response.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("SignalPaymentServer/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The JSON body every subscriber receives. Serialized once per dispatch pass so that all subscribers see an
/// identical payload and signatures are computed over the exact bytes sent.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl Envelope {
    pub fn new(event: &str, data: Value) -> Self {
        Self { event: event.to_string(), timestamp: Utc::now(), data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status.
    Delivered(u16),
    /// Anything else: connect error, timeout, or a non-2xx status.
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DeliveryOutcome::Failed(_))
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub subscriber_id: i64,
    pub subscriber_name: String,
    pub url: String,
    pub outcome: DeliveryOutcome,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Could not load webhook subscribers. {0}")]
    Store(#[from] SubscriberStoreError),
    #[error("Could not serialize the webhook envelope. {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Could not construct the webhook HTTP client. {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Clone)]
pub struct WebhookDispatcher<S: SubscriberStore> {
    store: S,
    client: reqwest::Client,
    config: DispatchConfig,
}

impl<S: SubscriberStore> WebhookDispatcher<S> {
    pub fn new(store: S, config: DispatchConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { store, client, config })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Delivers `event` to every active subscriber listening to it and returns one report per attempt.
    ///
    /// Stats bookkeeping failures are logged rather than propagated; losing a counter update must not turn a
    /// successful fan-out into an error.
    pub async fn dispatch_event(&self, event: &str, data: Value) -> Result<Vec<DeliveryReport>, DispatchError> {
        let subscribers = self.store.subscribers_for_event(event).await?;
        if subscribers.is_empty() {
            debug!("🚀️ No active subscribers for event [{event}]. Nothing to dispatch.");
            return Ok(Vec::new());
        }
        let envelope = Envelope::new(event, data);
        let payload = serde_json::to_string(&envelope)?;
        info!("🚀️ Dispatching [{event}] to {} subscriber(s)", subscribers.len());
        let attempts = subscribers.iter().map(|sub| self.attempt(sub, &payload));
        let reports = join_all(attempts).await;
        let failures = reports.iter().filter(|r| r.outcome.is_failure()).count();
        if failures > 0 {
            warn!("🚀️ {failures} of {} deliveries for [{event}] failed", reports.len());
        }
        Ok(reports)
    }

    /// Delivers an event to a single subscriber, active or not. Used by the webhook test endpoint so that a newly
    /// registered endpoint can be probed before it is enabled.
    pub async fn deliver_to(
        &self,
        subscriber: &WebhookSubscriber,
        event: &str,
        data: Value,
    ) -> Result<DeliveryReport, DispatchError> {
        let envelope = Envelope::new(event, data);
        let payload = serde_json::to_string(&envelope)?;
        Ok(self.attempt(subscriber, &payload).await)
    }

    async fn attempt(&self, subscriber: &WebhookSubscriber, payload: &str) -> DeliveryReport {
        let outcome = self.post_payload(subscriber, payload).await;
        match &outcome {
            DeliveryOutcome::Delivered(status) => {
                debug!("🚀️ Delivered to [{}] ({}): HTTP {status}", subscriber.name, subscriber.url);
            },
            DeliveryOutcome::Failed(reason) => {
                warn!("🚀️ Delivery to [{}] ({}) failed: {reason}", subscriber.name, subscriber.url);
            },
        }
        if let Err(e) = self.store.record_delivery_attempt(subscriber.id, outcome.is_failure(), Utc::now()).await {
            error!("🚀️ Could not record delivery stats for subscriber #{}: {e}", subscriber.id);
        }
        DeliveryReport {
            subscriber_id: subscriber.id,
            subscriber_name: subscriber.name.clone(),
            url: subscriber.url.clone(),
            outcome,
        }
    }

    async fn post_payload(&self, subscriber: &WebhookSubscriber, payload: &str) -> DeliveryOutcome {
        let mut request = self
            .client
            .post(&subscriber.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        if let Some(secret) = &subscriber.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(payload.as_bytes(), secret));
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => DeliveryOutcome::Delivered(response.status().as_u16()),
            Ok(response) => DeliveryOutcome::Failed(format!("HTTP {}", response.status().as_u16())),
            Err(e) if e.is_timeout() => DeliveryOutcome::Failed("Request timed out".to_string()),
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        }
    }
}
