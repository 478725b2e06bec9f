use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::db_types::{NewSubscriber, SubscriberPatch, WebhookSubscriber};

pub async fn insert(
    subscriber: NewSubscriber,
    conn: &mut SqliteConnection,
) -> Result<WebhookSubscriber, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO webhook_subscribers (name, url, secret, events, is_active, created_at)
            VALUES ($1, $2, $3, $4, 1, $5)
            RETURNING *;
        "#,
    )
    .bind(subscriber.name)
    .bind(subscriber.url)
    .bind(subscriber.secret)
    .bind(Json(subscriber.events))
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<WebhookSubscriber>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM webhook_subscribers ORDER BY created_at DESC, id DESC").fetch_all(conn).await
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<WebhookSubscriber>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM webhook_subscribers WHERE id = $1").bind(id).fetch_optional(conn).await
}

/// Active subscribers listening to `event`. The event set is stored as a JSON array, so the event filter is applied
/// in memory after narrowing to active rows.
pub async fn active_for_event(
    event: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<WebhookSubscriber>, sqlx::Error> {
    let active: Vec<WebhookSubscriber> =
        sqlx::query_as("SELECT * FROM webhook_subscribers WHERE is_active = 1").fetch_all(conn).await?;
    Ok(active.into_iter().filter(|s| s.listens_to(event)).collect())
}

/// Applies the patch field by field. An empty secret clears the stored secret.
pub async fn update(
    id: i64,
    patch: SubscriberPatch,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookSubscriber>, sqlx::Error> {
    if patch.is_empty() {
        return fetch_by_id(id, conn).await;
    }
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE webhook_subscribers SET ");
    let mut fields = builder.separated(", ");
    if let Some(name) = patch.name {
        fields.push("name = ");
        fields.push_bind_unseparated(name);
    }
    if let Some(url) = patch.url {
        fields.push("url = ");
        fields.push_bind_unseparated(url);
    }
    if let Some(secret) = patch.secret {
        let secret = if secret.is_empty() { None } else { Some(secret) };
        fields.push("secret = ");
        fields.push_bind_unseparated(secret);
    }
    if let Some(events) = patch.events {
        fields.push("events = ");
        fields.push_bind_unseparated(Json(events));
    }
    if let Some(is_active) = patch.is_active {
        fields.push("is_active = ");
        fields.push_bind_unseparated(is_active);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    builder.build_query_as::<WebhookSubscriber>().fetch_optional(conn).await
}

/// Hard delete. Returns `false` if the row did not exist.
pub async fn delete(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM webhook_subscribers WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Records one delivery attempt. A single statement keeps the counters race-free under concurrent dispatch passes.
pub async fn record_attempt(
    id: i64,
    failed: bool,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE webhook_subscribers
            SET last_triggered_at = $1,
                total_calls = total_calls + 1,
                failed_calls = failed_calls + (CASE WHEN $2 THEN 1 ELSE 0 END)
            WHERE id = $3
        "#,
    )
    .bind(at)
    .bind(failed)
    .bind(id)
    .execute(conn)
    .await?;
    Ok(())
}
