use std::{env, time::Duration};

use log::*;
use sps_common::Secret;

const DEFAULT_SPS_HOST: &str = "127.0.0.1";
const DEFAULT_SPS_PORT: u16 = 8480;
const DEFAULT_CURRENCY: &str = "BRL";
const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_APP_URL: &str = "http://localhost:8480";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The shared key for administrative endpoints, supplied by callers in the `X-Admin-Key` header.
    pub admin_api_key: Secret<String>,
    /// ISO currency code stamped onto payment records.
    pub currency: String,
    /// Per-attempt timeout for outbound webhook deliveries.
    pub webhook_timeout: Duration,
    pub webhook_user_agent: String,
    pub pagseguro: PagSeguroConfig,
}

#[derive(Clone, Debug, Default)]
pub struct PagSeguroConfig {
    pub token: Secret<String>,
    /// "production" or "sandbox". Anything else falls back to sandbox.
    pub environment: PagSeguroEnvironment,
    /// The public base URL of this deployment, used for the checkout redirect and notification URLs.
    pub app_url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PagSeguroEnvironment {
    Production,
    #[default]
    Sandbox,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPS_HOST.to_string(),
            port: DEFAULT_SPS_PORT,
            database_url: String::default(),
            admin_api_key: Secret::default(),
            currency: DEFAULT_CURRENCY.to_string(),
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            webhook_user_agent: default_user_agent(),
            pagseguro: PagSeguroConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPS_HOST").ok().unwrap_or_else(|| DEFAULT_SPS_HOST.into());
        let port = env::var("SPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPS_PORT. {e} Using the default, {DEFAULT_SPS_PORT}, \
                         instead."
                    );
                    DEFAULT_SPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPS_PORT);
        let database_url = env::var("SPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SPS_DATABASE_URL is not set. Please set it to the URL for the payment database.");
            String::default()
        });
        let admin_api_key = env::var("SPS_ADMIN_API_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SPS_ADMIN_API_KEY is not set. Administrative endpoints will reject every request until it is \
                 configured."
            );
            String::default()
        });
        let currency = env::var("SPS_CURRENCY").ok().unwrap_or_else(|| DEFAULT_CURRENCY.into());
        let webhook_timeout = env::var("SPS_WEBHOOK_TIMEOUT")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| {
                        warn!("🪛️ {s} is not a valid value for SPS_WEBHOOK_TIMEOUT (seconds). {e} Using the default.");
                    })
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT);
        let webhook_user_agent = env::var("SPS_WEBHOOK_USER_AGENT").ok().unwrap_or_else(default_user_agent);
        let pagseguro = PagSeguroConfig::from_env_or_default();
        Self {
            host,
            port,
            database_url,
            admin_api_key: Secret::new(admin_api_key),
            currency,
            webhook_timeout,
            webhook_user_agent,
            pagseguro,
        }
    }
}

impl PagSeguroConfig {
    pub fn from_env_or_default() -> Self {
        let token = env::var("SPS_PAGSEGURO_TOKEN").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SPS_PAGSEGURO_TOKEN is not set. Checkout creation and notification lookups against PagSeguro \
                 will fail."
            );
            String::default()
        });
        let environment = match env::var("SPS_PAGSEGURO_ENVIRONMENT").ok().as_deref() {
            Some("production") => PagSeguroEnvironment::Production,
            Some("sandbox") | None => PagSeguroEnvironment::Sandbox,
            Some(other) => {
                warn!("🪛️ {other} is not a valid SPS_PAGSEGURO_ENVIRONMENT. Using sandbox.");
                PagSeguroEnvironment::Sandbox
            },
        };
        let app_url = env::var("SPS_APP_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPS_APP_URL is not set. Using {DEFAULT_APP_URL} for checkout redirect and notification URLs.");
            DEFAULT_APP_URL.to_string()
        });
        Self { token: Secret::new(token), environment, app_url }
    }
}

fn default_user_agent() -> String {
    format!("SignalPaymentServer/{}", env!("CARGO_PKG_VERSION"))
}
