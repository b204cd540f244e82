//! # Shop engine public API
//!
//! The `shop_api` module exposes the programmatic API of the order engine. Every API is generic over the backend traits
//! it needs, so tests can swap in a fresh database (or a mock provider) without touching the API code.
//!
//! * [`order_flow_api`] creates orders and drives their lifecycle: staff transitions, cancellation and delivery.
//! * [`payment_api`] reconciles SePay transfers with orders, from the provider poll, the webhook and the background
//!   sweep.
//! * [`voucher_api`] lets customers claim and preview vouchers, and lets admins manage them.
//!
//! The remaining submodules are the building blocks the APIs are assembled from ([`assembler`],
//! [`voucher_evaluator`], [`stock_adjuster`], [`cart_clearer`]) and the request and response types.
//!
//! # API usage
//!
//! ```rust,ignore
//! use order_engine::{OrderFlowApi, SqliteDatabase, order_objects::{Actor, NewOrderRequest}};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OrderFlowApi::new(db, producers);
//! let placement = api.create_order(&Actor::user("alice"), request).await?;
//! ```

pub mod assembler;
pub mod cart_clearer;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
pub mod payment_objects;
pub mod stock_adjuster;
pub mod voucher_api;
pub mod voucher_evaluator;
pub mod voucher_objects;
