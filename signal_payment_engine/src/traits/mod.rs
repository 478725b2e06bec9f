//! Backend contracts for the payment engine.
//!
//! Two traits define everything a storage backend must provide:
//!
//! * [`PaymentGatewayDatabase`] covers the payment ledger and user subscription state, including the single atomic
//!   reconciliation operation that turns an approved-payment event into exactly one completed payment record plus
//!   one subscription extension.
//! * [`SubscriberStore`] covers the webhook subscriber registry: administrative CRUD plus the dispatcher's
//!   per-attempt statistics write path.

mod payment_gateway_database;
mod subscriber_store;

pub use payment_gateway_database::{PaymentGatewayDatabase, PaymentGatewayError, ReconcileOutcome};
pub use subscriber_store::{SubscriberStore, SubscriberStoreError};
