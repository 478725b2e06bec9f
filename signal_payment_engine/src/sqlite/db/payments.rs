use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ApprovedPaymentEvent, NewPendingPayment, Payment, PaymentStatus},
    traits::PaymentGatewayError,
};

/// Inserts a new `pending` payment record for a purchase the user has just initiated.
pub async fn insert_pending(
    payment: NewPendingPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentGatewayError> {
    let payment: Payment = sqlx::query_as(
        r#"
            INSERT INTO payments (user_id, amount, currency, status, gateway, subscription_days, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(payment.user_id)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(PaymentStatus::Pending.to_string())
    .bind(payment.gateway)
    .bind(payment.subscription_days)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("📝️ Pending payment #{} created for user [{}]", payment.id, payment.user_id);
    Ok(payment)
}

/// Inserts a `completed` payment record for a reconciled gateway notification.
///
/// Returns the raw `sqlx::Error` so that callers can distinguish a unique-constraint violation on
/// `gateway_payment_id` (a concurrent duplicate) from genuine failures.
pub async fn insert_completed(
    event: &ApprovedPaymentEvent,
    currency: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
            INSERT INTO payments
                (user_id, amount, currency, status, gateway, gateway_payment_id, subscription_days, applied_at,
                 raw_metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(&event.user_id)
    .bind(event.amount)
    .bind(currency)
    .bind(PaymentStatus::Completed.to_string())
    .bind(&event.gateway)
    .bind(&event.gateway_payment_id)
    .bind(event.subscription_days)
    .bind(now)
    .bind(&event.raw_metadata)
    .bind(now)
    .fetch_one(conn)
    .await
}

/// Returns the payment carrying the given gateway payment id, if any.
pub async fn fetch_by_gateway_payment_id(
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE gateway_payment_id = $1")
        .bind(gateway_payment_id)
        .fetch_optional(conn)
        .await
}

/// Records the gateway's order reference against an existing payment record.
pub async fn set_gateway_order_id(
    payment_id: i64,
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), PaymentGatewayError> {
    let result = sqlx::query("UPDATE payments SET gateway_order_id = $1 WHERE id = $2")
        .bind(gateway_order_id)
        .bind(payment_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(PaymentGatewayError::PaymentNotFound(payment_id));
    }
    Ok(())
}

/// All payments for the user, newest first.
pub async fn history_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}
