//! # Signal payment server
//! This module hosts the HTTP boundary for the signal payment engine. It is responsible for:
//! Listening for incoming payment notifications from the supported gateways.
//! Creating checkouts for plan purchases and serving payment history.
//! Managing the webhook subscriber registry and pushing test deliveries through the dispatcher.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/webhook`: The inbound notification route for payment gateways.
//! * `/payments/create`, `/payments/history`, `/payments/plans`: the user-facing payment routes.
//! * `/webhooks` and friends: administrative CRUD over webhook subscribers, plus per-endpoint test deliveries.
//! * `/admin/users/{id}/subscription`: administrative subscription extension.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
