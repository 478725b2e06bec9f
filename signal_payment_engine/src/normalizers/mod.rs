//! Gateway normalizers.
//!
//! Each supported payment gateway speaks its own wire format. A normalizer recognizes its gateway by a
//! discriminating field in the notification body and converts it into the canonical [`ApprovedPaymentEvent`]; a
//! payload that belongs to another gateway yields `NotApplicable` rather than an error, so the normalizers form a
//! closed set tried in a fixed order:
//!
//! 1. [`pagseguro`], recognized by a `notificationCode` field. The notification itself carries no transaction data;
//!    the normalizer fetches the transaction details from the gateway (via the injected [`TransactionSource`]) and
//!    extracts the fields it needs from the XML response.
//! 2. [`generic`], a flat JSON shape (`payment_id`, `user_id`, `status`, ...) shared by simpler gateways.
//!
//! Normalizers never write to the data store.

use log::trace;
use serde_json::Value;
use thiserror::Error;

use crate::db_types::ApprovedPaymentEvent;

pub mod generic;
pub mod pagseguro;

/// The tri-state result of running a payload past a normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The payload matched this gateway and describes an approved payment.
    Matched(ApprovedPaymentEvent),
    /// The payload does not belong to this gateway, or describes a non-approved status that the engine deliberately
    /// ignores (the origin still receives an acknowledgement).
    NotApplicable,
    /// The payload matched a gateway but is missing required fields, or the gateway's transaction API could not be
    /// consulted. Carries a reason for the logs.
    Invalid(String),
}

/// Out-of-band access to a gateway's transaction-details API. The markup-style gateway only sends a notification
/// code; the actual transaction must be fetched separately. Implemented by the server's gateway integration and
/// mocked in tests.
#[allow(async_fn_in_trait)]
pub trait TransactionSource {
    async fn transaction_details(&self, notification_code: &str) -> Result<String, TransactionSourceError>;
}

#[derive(Debug, Clone, Error)]
pub enum TransactionSourceError {
    #[error("Gateway API request failed. {0}")]
    Request(String),
    #[error("Gateway API returned status {status}. {message}")]
    UnexpectedResponse { status: u16, message: String },
}

/// Runs the notification body through every normalizer in the fixed order until one claims it.
pub async fn normalize<S: TransactionSource>(body: &Value, source: &S) -> NormalizeOutcome {
    if pagseguro::notification_code(body).is_some() {
        trace!("🧾️ Notification carries a PagSeguro notification code");
        return pagseguro::normalize(body, source).await;
    }
    generic::normalize(body)
}
