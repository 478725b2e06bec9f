//! Normalizer for flat-JSON gateway notifications.
//!
//! Several gateways can be bridged onto a single shape: `{payment_id, user_id, status, amount, gateway, metadata}`.
//! Only `status` of `approved` or `completed` produces an event; any other status is acknowledged and ignored.

use log::debug;
use serde_json::Value;
use sps_common::Money;

use crate::{
    db_types::ApprovedPaymentEvent,
    normalizers::{pagseguro::DEFAULT_SUBSCRIPTION_DAYS, NormalizeOutcome},
};

pub const GATEWAY_NAME: &str = "generic";

pub fn normalize(body: &Value) -> NormalizeOutcome {
    let status = body.get("status").and_then(Value::as_str);
    let payment_id = body.get("payment_id").and_then(Value::as_str);
    if status.is_none() && payment_id.is_none() {
        return NormalizeOutcome::NotApplicable;
    }
    let status = match status {
        Some(s) => s,
        None => return NormalizeOutcome::Invalid("notification is missing the status field".into()),
    };
    if status != "approved" && status != "completed" {
        debug!("🧾️ Ignoring generic notification with status '{status}'");
        return NormalizeOutcome::NotApplicable;
    }
    let Some(payment_id) = payment_id else {
        return NormalizeOutcome::Invalid("approved notification is missing the payment_id field".into());
    };
    let Some(user_id) = body.get("user_id").and_then(Value::as_str) else {
        return NormalizeOutcome::Invalid("approved notification is missing the user_id field".into());
    };
    let amount = body.get("amount").and_then(Value::as_f64).and_then(|v| Money::from_decimal(v).ok());
    let Some(amount) = amount else {
        return NormalizeOutcome::Invalid("approved notification has a missing or malformed amount".into());
    };
    let gateway = body.get("gateway").and_then(Value::as_str).unwrap_or(GATEWAY_NAME).to_string();
    NormalizeOutcome::Matched(ApprovedPaymentEvent {
        gateway_payment_id: payment_id.to_string(),
        user_id: user_id.to_string(),
        gateway,
        amount,
        subscription_days: DEFAULT_SUBSCRIPTION_DAYS,
        raw_metadata: body.to_string(),
    })
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn approved_notification_is_matched() {
        let body = json!({
            "payment_id": "PAY-1",
            "user_id": "user-9",
            "status": "approved",
            "amount": 79.90,
            "gateway": "mercadopago",
        });
        let NormalizeOutcome::Matched(event) = normalize(&body) else {
            panic!("expected a match");
        };
        assert_eq!(event.gateway_payment_id, "PAY-1");
        assert_eq!(event.user_id, "user-9");
        assert_eq!(event.gateway, "mercadopago");
        assert_eq!(event.amount, Money::from_cents(7990));
        // The whole body is preserved for audit.
        assert!(event.raw_metadata.contains("PAY-1"));
    }

    #[test]
    fn completed_status_also_matches() {
        let body = json!({"payment_id": "P", "user_id": "u", "status": "completed", "amount": 1.0});
        assert!(matches!(normalize(&body), NormalizeOutcome::Matched(_)));
    }

    #[test]
    fn gateway_defaults_to_generic() {
        let body = json!({"payment_id": "P", "user_id": "u", "status": "approved", "amount": 1.0});
        let NormalizeOutcome::Matched(event) = normalize(&body) else {
            panic!("expected a match");
        };
        assert_eq!(event.gateway, "generic");
    }

    #[test]
    fn rejected_status_is_not_applicable() {
        let body = json!({"payment_id": "P", "user_id": "u", "status": "rejected", "amount": 1.0});
        assert_eq!(normalize(&body), NormalizeOutcome::NotApplicable);
    }

    #[test]
    fn missing_discriminators_are_not_applicable() {
        assert_eq!(normalize(&json!({"something": "else"})), NormalizeOutcome::NotApplicable);
    }

    #[test]
    fn approved_without_payment_id_is_invalid() {
        let body = json!({"user_id": "u", "status": "approved", "amount": 1.0});
        assert!(matches!(normalize(&body), NormalizeOutcome::Invalid(_)));
    }

    #[test]
    fn approved_without_user_id_is_invalid() {
        let body = json!({"payment_id": "P", "status": "approved", "amount": 1.0});
        assert!(matches!(normalize(&body), NormalizeOutcome::Invalid(_)));
    }

    #[test]
    fn malformed_amount_is_invalid() {
        let body = json!({"payment_id": "P", "user_id": "u", "status": "approved", "amount": "a lot"});
        assert!(matches!(normalize(&body), NormalizeOutcome::Invalid(_)));
    }
}
