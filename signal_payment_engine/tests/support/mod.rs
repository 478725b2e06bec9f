//! Shared setup for the engine integration tests: throwaway SQLite databases and a bare-bones HTTP receiver for
//! exercising webhook deliveries.
#![allow(dead_code)]

use std::sync::Arc;

use log::*;
use signal_payment_engine::{db_types::ApprovedPaymentEvent, SqliteDatabase};
use sps_common::Money;
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::Mutex,
};

/// A fresh database in a temp directory. Keep the `TempDir` alive for the duration of the test.
pub async fn prepare_test_env() -> (SqliteDatabase, TempDir) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let url = format!("sqlite://{}/test_store_{}.db", dir.path().display(), rand::random::<u32>());
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    debug!("🚀️ Test database ready at {url}");
    (db, dir)
}

pub async fn seed_user(db: &SqliteDatabase, id: &str) {
    db.create_user(id, &format!("{id}@example.com"), id, "USER").await.expect("Error creating user");
}

pub fn approved_event(gateway_payment_id: &str, user_id: &str) -> ApprovedPaymentEvent {
    ApprovedPaymentEvent {
        gateway_payment_id: gateway_payment_id.to_string(),
        user_id: user_id.to_string(),
        gateway: "pagseguro".to_string(),
        amount: Money::from_cents(2990),
        subscription_days: 30,
        raw_metadata: "<status>3</status>".to_string(),
    }
}

/// One request as seen by a [`StubReceiver`].
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub headers: String,
    pub body: String,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        let needle = format!("{}:", name.to_ascii_lowercase());
        self.headers
            .lines()
            .find(|line| line.to_ascii_lowercase().starts_with(&needle))
            .map(|line| line[needle.len()..].trim().to_string())
    }
}

/// A minimal HTTP endpoint that records every request it receives and answers each with a fixed status code. When
/// `stall` is set it accepts connections but never responds, which is how a subscriber that hangs looks from the
/// dispatcher's side.
pub struct StubReceiver {
    pub url: String,
    pub requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl StubReceiver {
    pub async fn start(status: u16) -> Self {
        Self::spawn(status, false).await
    }

    pub async fn start_stalling() -> Self {
        Self::spawn(200, true).await
    }

    async fn spawn(status: u16, stall: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Could not bind stub receiver");
        let addr = listener.local_addr().expect("No local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    // Read headers, then exactly Content-Length bytes of body.
                    let (headers, mut body) = loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(pos) = find_header_end(&buf) {
                            let headers = String::from_utf8_lossy(&buf[..pos]).to_string();
                            let body = buf[pos + 4..].to_vec();
                            break (headers, body);
                        }
                    };
                    let expected = content_length(&headers);
                    while body.len() < expected {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => n,
                        };
                        body.extend_from_slice(&chunk[..n]);
                    }
                    log.lock().await.push(ReceivedRequest {
                        headers,
                        body: String::from_utf8_lossy(&body).to_string(),
                    });
                    if stall {
                        // Hold the connection open without answering until the client gives up.
                        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                        return;
                    }
                    let response =
                        format!("HTTP/1.1 {status} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        Self { url: format!("http://{addr}/hook"), requests }
    }

    pub async fn received(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().await.clone()
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(headers: &str) -> usize {
    headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
        })
        .unwrap_or(0)
}
