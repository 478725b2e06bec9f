use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::User;

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

/// Moves the user's subscription expiry. The caller is responsible for computing the new expiry with the
/// subscription clock; this function only persists it.
pub async fn set_subscription_end(
    user_id: &str,
    ends_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<User, sqlx::Error> {
    let user: User = sqlx::query_as("UPDATE users SET subscription_ends_at = $1 WHERE id = $2 RETURNING *")
        .bind(ends_at)
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    debug!("📝️ Subscription for user [{}] now ends at {ends_at}", user.id);
    Ok(user)
}

/// Creates a user record. User provisioning is owned by an external collaborator in production; this exists for
/// tests and tooling.
pub async fn insert_user(
    id: &str,
    email: &str,
    name: &str,
    role: &str,
    conn: &mut SqliteConnection,
) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO users (id, email, name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(role)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}
