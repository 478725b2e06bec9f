//! # SQLite database methods
//!
//! Low-level query functions, maintained as plain functions that accept a `&mut SqliteConnection` argument. Callers
//! obtain a connection from a pool, or open a transaction and pass `&mut *tx` when several calls must commit as one
//! atomic unit.

use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Error as SqlxError, Sqlite, SqlitePool};

pub mod payments;
pub mod subscribers;
pub mod users;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        info!("Creating Sqlite database {url}");
        Sqlite::create_database(url).await?;
    }
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates the engine's tables if they are not present yet.
///
/// The unique index on `payments.gateway_payment_id` is the authoritative dedup mechanism for inbound gateway
/// notifications; everything else in the engine assumes it exists.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), SqlxError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER',
            subscription_ends_at TIMESTAMP NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL REFERENCES users (id),
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            gateway TEXT NOT NULL,
            gateway_order_id TEXT NULL,
            gateway_payment_id TEXT NULL UNIQUE,
            subscription_days INTEGER NOT NULL,
            applied_at TIMESTAMP NULL,
            raw_metadata TEXT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_subscribers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            secret TEXT NULL,
            events TEXT NOT NULL DEFAULT '["signal.created"]',
            is_active BOOLEAN NOT NULL DEFAULT 1,
            last_triggered_at TIMESTAMP NULL,
            total_calls INTEGER NOT NULL DEFAULT 0,
            failed_calls INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
