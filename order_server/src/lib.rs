//! # Shop order server
//! This crate hosts the HTTP server for the shop's order core. It is responsible for:
//! * Placing, querying, cancelling and administering orders on behalf of authenticated users.
//! * Reconciling bank transfers, both by polling SePay for the customer and by receiving SePay's webhooks.
//! * Pushing "order paid" notifications to clients waiting on the payment page.
//! * Claiming, previewing and administering vouchers.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/check-status`, `/payments/webhook`, `/payments/qr/{orderId}` and `/payments/events/{orderId}`.
//! * `/vouchers/public`.
//!
//! Everything under `/api` requires a bearer token. See [routes](routes/index.html) for the full list.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod notifications;
pub mod payment_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
