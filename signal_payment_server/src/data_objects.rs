use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sps_common::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The unconditional acknowledgement returned to payment gateways. Gateways retry on anything else, so the webhook
/// endpoint only withholds this when the body cannot be parsed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

impl WebhookAck {
    pub fn received() -> Self {
        Self { received: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePaymentRequest {
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default = "default_gateway")]
    pub gateway: String,
}

fn default_plan() -> String {
    "monthly".to_string()
}

fn default_gateway() -> String {
    "pagseguro".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub payment_id: i64,
    pub plan: String,
    pub amount: Money,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendSubscriptionRequest {
    #[serde(default = "default_extension_days")]
    pub days: i64,
}

fn default_extension_days() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryAttemptResult {
    pub subscriber_id: i64,
    pub delivered: bool,
    pub detail: String,
}
