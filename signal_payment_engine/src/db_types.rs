use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sps_common::Money;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The payment record was created when the user initiated a purchase, and no gateway confirmation has arrived.
    Pending,
    /// The gateway approved the payment and the subscription extension has been applied. Terminal.
    Completed,
    /// The gateway rejected the payment. Terminal.
    Failed,
    /// The payment was cancelled before completion. Terminal.
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid payment status: {0}")]
pub struct ConversionError(String);

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status in record: {value}. Defaulting to pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A ledger entry for a single purchase. Append-mostly: a record is created as `pending` and transitions to
/// `completed` exactly once, at reconciliation time. `gateway_payment_id` carries a unique constraint and is the
/// idempotency key for inbound gateway notifications.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub subscription_days: i64,
    pub applied_at: Option<DateTime<Utc>>,
    /// The raw gateway notification, kept for audit only. Never sent to API clients or webhook subscribers.
    #[serde(skip)]
    pub raw_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The fields needed to open a new `pending` payment when a user initiates a purchase.
#[derive(Debug, Clone)]
pub struct NewPendingPayment {
    pub user_id: String,
    pub amount: Money,
    pub currency: String,
    pub gateway: String,
    pub subscription_days: i64,
}

//--------------------------------------  ApprovedPaymentEvent  ------------------------------------------------------
/// The canonical result of normalizing a gateway notification: one approved payment, expressed independently of the
/// gateway's wire format. `gateway_payment_id` is globally unique across gateways; reconciliation is a no-op when a
/// payment record with that id already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedPaymentEvent {
    pub gateway_payment_id: String,
    pub user_id: String,
    pub gateway: String,
    pub amount: Money,
    pub subscription_days: i64,
    /// The raw gateway response, stored verbatim for audit. Never parsed downstream.
    pub raw_metadata: String,
}

//--------------------------------------        User         ---------------------------------------------------------
/// The slice of the user record the engine cares about. `subscription_ends_at` is the sole subscription-state field;
/// it is written by payment reconciliation and by the administrative extension path, and nothing else.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  WebhookSubscriber  ---------------------------------------------------------
/// A registered external endpoint that receives webhook deliveries for the events it has opted into.
///
/// Configuration fields (`name`, `url`, `secret`, `events`, `is_active`) are owned by the administrative CRUD
/// endpoints. The trailing statistics fields are owned by the dispatcher and updated once per delivery attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookSubscriber {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub events: Json<Vec<String>>,
    pub is_active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub total_calls: i64,
    pub failed_calls: i64,
    pub created_at: DateTime<Utc>,
}

impl WebhookSubscriber {
    pub fn listens_to(&self, event: &str) -> bool {
        self.events.0.iter().any(|e| e == event)
    }
}

/// The fields required to register a new webhook subscriber.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubscriber {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_events")]
    pub events: Vec<String>,
}

fn default_events() -> Vec<String> {
    vec!["signal.created".to_string()]
}

/// A partial update for a webhook subscriber. `None` fields are left untouched; to clear a secret, supply an empty
/// string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub secret: Option<String>,
    pub events: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl SubscriberPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() &&
            self.url.is_none() &&
            self.secret.is_none() &&
            self.events.is_none() &&
            self.is_active.is_none()
    }
}
