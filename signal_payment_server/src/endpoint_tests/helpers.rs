use signal_payment_engine::{
    normalizers::{TransactionSource, TransactionSourceError},
    SqliteDatabase,
};
use sps_common::Secret;
use tempfile::TempDir;

use crate::config::ServerConfig;

pub const TEST_ADMIN_KEY: &str = "test-admin-key";

pub fn test_config() -> ServerConfig {
    ServerConfig { admin_api_key: Secret::new(TEST_ADMIN_KEY.to_string()), ..Default::default() }
}

/// A fresh database in a temp directory. Keep the `TempDir` alive for the duration of the test.
pub async fn test_db() -> (SqliteDatabase, TempDir) {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let url = format!("sqlite://{}/endpoint_test_{}.db", dir.path().display(), rand::random::<u32>());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    (db, dir)
}

pub async fn seed_user(db: &SqliteDatabase, id: &str) {
    db.create_user(id, &format!("{id}@example.com"), id, "USER").await.expect("Error creating user");
}

/// A canned transaction source, standing in for the PagSeguro transaction API.
pub struct StubSource(pub Result<String, TransactionSourceError>);

impl StubSource {
    pub fn returning(xml: &str) -> Self {
        Self(Ok(xml.to_string()))
    }
}

impl TransactionSource for StubSource {
    async fn transaction_details(&self, _code: &str) -> Result<String, TransactionSourceError> {
        self.0.clone()
    }
}
