//! Signal Payment Engine
//!
//! Core logic for the signal payment service: it turns raw gateway notifications into canonical approved-payment
//! events, reconciles them against the payment ledger exactly once, extends user subscriptions, and fans completed
//! payments out to registered webhook subscribers.
//!
//! The library is divided into four main sections:
//! 1. Gateway normalizers ([`mod@normalizers`]). Each supported gateway translates its notification format into a
//!    canonical [`db_types::ApprovedPaymentEvent`], or declines the notification.
//! 2. The engine public API ([`mod@spe_api`]). [`PaymentFlowApi`] handles reconciliation, plan purchases and
//!    subscription extensions; [`SubscriberApi`] manages the webhook subscriber registry. Backends implement the
//!    traits in [`mod@traits`] to plug in; SQLite is the one shipped here.
//! 3. The outbound webhook dispatcher ([`mod@dispatch`]), which signs and delivers events concurrently with
//!    per-endpoint stats.
//! 4. Events ([`mod@events`]): a small actor framework emits a `PaymentCompletedEvent` after each successful
//!    reconciliation so that the server can hook the dispatcher (or anything else) into the payment flow.

pub mod db_types;
pub mod dispatch;
pub mod events;
pub mod normalizers;
pub mod plans;
pub mod signature;
mod spe_api;
pub mod subscription;
pub mod traits;

mod sqlite;

pub use spe_api::{payment_flow_api::PaymentFlowApi, subscriber_api::SubscriberApi};
pub use sqlite::{db, SqliteDatabase};
pub use traits::{
    PaymentGatewayDatabase,
    PaymentGatewayError,
    ReconcileOutcome,
    SubscriberStore,
    SubscriberStoreError,
};
