//! PagSeguro gateway client.
//!
//! Two call paths: creating a checkout for a plan purchase, and fetching the transaction behind an inbound
//! notification code (the [`TransactionSource`] half, consumed by the markup normalizer). PagSeguro speaks XML on
//! both; responses are mined with regexes for the handful of fields the server needs rather than pulling in a full
//! XML parser.

use std::sync::Arc;

use log::*;
use regex::Regex;
use reqwest::Client;
use signal_payment_engine::{
    normalizers::{TransactionSource, TransactionSourceError},
    plans::Plan,
};
use thiserror::Error;

use crate::config::{PagSeguroConfig, PagSeguroEnvironment};

const PRODUCTION_WS_URL: &str = "https://ws.pagseguro.uol.com.br";
const SANDBOX_WS_URL: &str = "https://ws.sandbox.pagseguro.uol.com.br";
const PRODUCTION_CHECKOUT_URL: &str = "https://pagseguro.uol.com.br/v2/checkout/payment.html";
const SANDBOX_CHECKOUT_URL: &str = "https://sandbox.pagseguro.uol.com.br/v2/checkout/payment.html";

#[derive(Debug, Error)]
pub enum PagSeguroApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Checkout request failed: {0}")]
    RequestError(String),
    #[error("Checkout creation failed. Error {status}. {message}")]
    CheckoutRejected { status: u16, message: String },
    #[error("The checkout response did not contain a checkout code.")]
    MissingCheckoutCode,
}

#[derive(Clone)]
pub struct PagSeguroApi {
    config: PagSeguroConfig,
    client: Arc<Client>,
}

impl PagSeguroApi {
    pub fn new(config: PagSeguroConfig) -> Result<Self, PagSeguroApiError> {
        let client = Client::builder().build().map_err(|e| PagSeguroApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn ws_url(&self) -> &'static str {
        match self.config.environment {
            PagSeguroEnvironment::Production => PRODUCTION_WS_URL,
            PagSeguroEnvironment::Sandbox => SANDBOX_WS_URL,
        }
    }

    /// Creates a checkout session for `plan` and returns the URL to send the user to.
    ///
    /// The user id travels in the `<reference>` field; PagSeguro echoes it back in the transaction details when the
    /// notification arrives, which is how the webhook path knows whose subscription to extend.
    pub async fn create_checkout(
        &self,
        user_id: &str,
        user_name: &str,
        user_email: &str,
        plan: &Plan,
    ) -> Result<String, PagSeguroApiError> {
        let app_url = &self.config.app_url;
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<checkout>
  <currency>BRL</currency>
  <redirectURL>{app_url}/dashboard?payment=success</redirectURL>
  <notificationURL>{app_url}/payments/webhook</notificationURL>
  <items>
    <item>
      <id>1</id>
      <description>{}</description>
      <amount>{}</amount>
      <quantity>1</quantity>
    </item>
  </items>
  <reference>{}</reference>
  <sender>
    <name>{}</name>
    <email>{}</email>
  </sender>
</checkout>"#,
            xml_escape(plan.name),
            plan.amount,
            xml_escape(user_id),
            xml_escape(user_name),
            xml_escape(user_email),
        );
        let url = format!("{}/v2/checkout", self.ws_url());
        trace!("🧾️ Creating PagSeguro checkout for user [{user_id}], plan [{}]", plan.code);
        let response = self
            .client
            .post(&url)
            .query(&[("token", self.config.token.reveal().as_str())])
            .header("Content-Type", "application/xml; charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| PagSeguroApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PagSeguroApiError::RequestError(e.to_string()))?;
            warn!("🧾️ PagSeguro rejected the checkout request. Status {status}. {message}");
            return Err(PagSeguroApiError::CheckoutRejected { status, message });
        }
        let body = response.text().await.map_err(|e| PagSeguroApiError::RequestError(e.to_string()))?;
        let code = extract_checkout_code(&body).ok_or(PagSeguroApiError::MissingCheckoutCode)?;
        let base = match self.config.environment {
            PagSeguroEnvironment::Production => PRODUCTION_CHECKOUT_URL,
            PagSeguroEnvironment::Sandbox => SANDBOX_CHECKOUT_URL,
        };
        let checkout_url = format!("{base}?code={code}");
        debug!("🧾️ Checkout created for user [{user_id}]: {checkout_url}");
        Ok(checkout_url)
    }
}

impl TransactionSource for PagSeguroApi {
    async fn transaction_details(&self, notification_code: &str) -> Result<String, TransactionSourceError> {
        let url = format!("{}/v3/transactions/notifications/{notification_code}", self.ws_url());
        trace!("🧾️ Fetching PagSeguro transaction for notification [{notification_code}]");
        let response = self
            .client
            .get(&url)
            .query(&[("token", self.config.token.reveal().as_str())])
            .send()
            .await
            .map_err(|e| TransactionSourceError::Request(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TransactionSourceError::UnexpectedResponse { status, message });
        }
        response.text().await.map_err(|e| TransactionSourceError::Request(e.to_string()))
    }
}

fn extract_checkout_code(body: &str) -> Option<String> {
    let re = Regex::new(r"<code>(.*?)</code>").unwrap();
    re.captures(body).map(|caps| caps[1].to_string())
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
