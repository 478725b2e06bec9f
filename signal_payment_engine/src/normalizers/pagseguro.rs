//! Normalizer for PagSeguro-style notifications.
//!
//! The gateway POSTs a body containing only a notification code (`notificationCode` or `notification_code`). The
//! transaction itself must be fetched from the gateway's transaction API, which answers with an XML document. Only a
//! handful of fields matter, so they are extracted by pattern rather than by a full XML parse:
//!
//! * `<status>`: numeric transaction status. Only status 3 ("paid") produces an approved-payment event; every other
//!   status is acknowledged and ignored.
//! * `<reference>`: the merchant reference set at checkout-creation time, which this system uses for the user id.
//! * `<code>`: the gateway's transaction code, used as the idempotency key. Falls back to the notification code.
//! * `<grossAmount>`: the paid amount. Falls back to zero when absent.

use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use sps_common::Money;

use crate::{
    db_types::ApprovedPaymentEvent,
    normalizers::{NormalizeOutcome, TransactionSource},
};

pub const GATEWAY_NAME: &str = "pagseguro";

/// PagSeguro transaction statuses: 1 = awaiting payment, 3 = paid, 7 = cancelled.
const STATUS_PAID: u32 = 3;

/// Every gateway-notified payment extends the subscription by a fixed number of days. Pending records created via
/// the checkout path carry their plan's day count instead; this default applies to notifications that arrive without
/// a matching pending record.
pub const DEFAULT_SUBSCRIPTION_DAYS: i64 = 30;

/// Extracts the notification code that discriminates a PagSeguro notification from other gateways' payloads.
pub fn notification_code(body: &Value) -> Option<String> {
    body.get("notificationCode")
        .or_else(|| body.get("notification_code"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub async fn normalize<S: TransactionSource>(body: &Value, source: &S) -> NormalizeOutcome {
    let Some(code) = notification_code(body) else {
        return NormalizeOutcome::NotApplicable;
    };
    debug!("🧾️ Fetching PagSeguro transaction details for notification [{code}]");
    let details = match source.transaction_details(&code).await {
        Ok(xml) => xml,
        Err(e) => {
            warn!("🧾️ Could not fetch transaction details for notification [{code}]. {e}");
            return NormalizeOutcome::Invalid(format!("transaction details unavailable: {e}"));
        },
    };
    extract_event(&code, &details)
}

/// Pulls the required fields out of the transaction XML and classifies the notification.
fn extract_event(notification_code: &str, details: &str) -> NormalizeOutcome {
    let status = capture(details, r"<status>(\d+)</status>").and_then(|s| s.parse::<u32>().ok());
    let reference = capture(details, r"<reference>(.*?)</reference>");
    let (Some(status), Some(reference)) = (status, reference) else {
        return NormalizeOutcome::Invalid("transaction details are missing the status or reference field".into());
    };
    if status != STATUS_PAID {
        debug!("🧾️ Ignoring PagSeguro notification [{notification_code}] with status {status}");
        return NormalizeOutcome::NotApplicable;
    }
    let payment_code = capture(details, r"<code>(.*?)</code>").unwrap_or_else(|| notification_code.to_string());
    let amount = capture(details, r"<grossAmount>([\d.]+)</grossAmount>")
        .and_then(|s| s.parse::<Money>().ok())
        .unwrap_or_default();
    NormalizeOutcome::Matched(ApprovedPaymentEvent {
        gateway_payment_id: payment_code,
        user_id: reference,
        gateway: GATEWAY_NAME.to_string(),
        amount,
        subscription_days: DEFAULT_SUBSCRIPTION_DAYS,
        raw_metadata: details.to_string(),
    })
}

fn capture(haystack: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).unwrap();
    re.captures(haystack).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::normalizers::{test_support::StaticSource, TransactionSourceError};

    const PAID_XML: &str = "<transaction><status>3</status><reference>user-17</reference>\
                            <code>TX-9001</code><grossAmount>29.90</grossAmount></transaction>";

    async fn run(body: Value, details: Result<String, TransactionSourceError>) -> NormalizeOutcome {
        normalize(&body, &StaticSource(details)).await
    }

    #[tokio::test]
    async fn paid_transaction_is_matched() {
        let body = json!({"notificationCode": "NOTIF-1"});
        let outcome = run(body, Ok(PAID_XML.to_string())).await;
        let NormalizeOutcome::Matched(event) = outcome else {
            panic!("expected a match, got {outcome:?}");
        };
        assert_eq!(event.gateway_payment_id, "TX-9001");
        assert_eq!(event.user_id, "user-17");
        assert_eq!(event.gateway, "pagseguro");
        assert_eq!(event.amount, Money::from_cents(2990));
        assert_eq!(event.subscription_days, 30);
        assert_eq!(event.raw_metadata, PAID_XML);
    }

    #[tokio::test]
    async fn snake_case_notification_code_is_accepted() {
        let body = json!({"notification_code": "NOTIF-2"});
        let outcome = run(body, Ok(PAID_XML.to_string())).await;
        assert!(matches!(outcome, NormalizeOutcome::Matched(_)));
    }

    #[tokio::test]
    async fn awaiting_payment_is_not_applicable() {
        let xml = "<status>1</status><reference>user-17</reference>";
        let outcome = run(json!({"notificationCode": "N"}), Ok(xml.to_string())).await;
        assert_eq!(outcome, NormalizeOutcome::NotApplicable);
    }

    #[tokio::test]
    async fn missing_reference_is_invalid() {
        let xml = "<status>3</status><code>TX-1</code>";
        let outcome = run(json!({"notificationCode": "N"}), Ok(xml.to_string())).await;
        assert!(matches!(outcome, NormalizeOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn missing_code_falls_back_to_notification_code() {
        let xml = "<status>3</status><reference>user-17</reference>";
        let outcome = run(json!({"notificationCode": "NOTIF-3"}), Ok(xml.to_string())).await;
        let NormalizeOutcome::Matched(event) = outcome else {
            panic!("expected a match");
        };
        assert_eq!(event.gateway_payment_id, "NOTIF-3");
        assert_eq!(event.amount, Money::default());
    }

    #[tokio::test]
    async fn gateway_api_failure_is_invalid() {
        let err = TransactionSourceError::Request("connection refused".to_string());
        let outcome = run(json!({"notificationCode": "N"}), Err(err)).await;
        assert!(matches!(outcome, NormalizeOutcome::Invalid(_)));
    }
}
