//! Subscription expiry arithmetic.
//!
//! A single pure function decides every subscription extension in the system, so the stacking rule lives in exactly
//! one place: expired (or absent) subscriptions restart from now, active subscriptions stack on top of their current
//! expiry. The new expiry is never earlier than `now + days`.

use chrono::{DateTime, Duration, Utc};

/// Computes the new subscription expiry after buying `days` more days.
pub fn extend_subscription(current: Option<DateTime<Utc>>, days: i64) -> DateTime<Utc> {
    extend_subscription_at(current, days, Utc::now())
}

/// As [`extend_subscription`], with an explicit `now` for deterministic tests.
pub fn extend_subscription_at(current: Option<DateTime<Utc>>, days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = match current {
        Some(end) if end > now => end,
        _ => now,
    };
    base + Duration::days(days)
}

#[cfg(test)]
mod test {
    use chrono::DateTime;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-15T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn no_subscription_starts_from_now() {
        let end = extend_subscription_at(None, 30, now());
        assert_eq!(end, now() + Duration::days(30));
    }

    #[test]
    fn expired_subscription_does_not_stack() {
        let expired = Some(now() - Duration::days(1));
        let end = extend_subscription_at(expired, 30, now());
        assert_eq!(end, now() + Duration::days(30));
    }

    #[test]
    fn active_subscription_stacks() {
        let active = Some(now() + Duration::days(10));
        let end = extend_subscription_at(active, 30, now());
        assert_eq!(end, now() + Duration::days(40));
    }

    #[test]
    fn expiry_exactly_now_restarts() {
        let end = extend_subscription_at(Some(now()), 7, now());
        assert_eq!(end, now() + Duration::days(7));
    }
}
