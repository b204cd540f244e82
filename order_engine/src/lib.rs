//! Shop order engine
//!
//! The order engine is the transactional core of the shop backend. It turns a customer's request into a priced,
//! stock-reserved order, applies vouchers, drives the order status lifecycle and reconciles bank transfers reported by
//! SePay with the orders that are waiting for them.
//!
//! The library is divided into these sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). The data
//!    types stored in the database live in [`mod@db_types`].
//! 2. The public API ([`mod@shop_api`]). [`OrderFlowApi`], [`PaymentApi`] and [`VoucherApi`] are what the HTTP server
//!    talks to.
//! 3. Events ([`mod@events`]). The engine announces paid and cancelled orders to registered hooks, and fans "paid"
//!    notices out to live subscribers.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod shop_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use shop_api::{
    errors::{ErrorKind, OrderFlowError, VoucherApiError, VoucherRejection},
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_api::{mark_order_paid, PaymentApi, SweepResult, DEFAULT_POLL_COOLDOWN, DEFAULT_PROVIDER_TIMEOUT},
    payment_objects,
    voucher_api::VoucherApi,
    voucher_objects,
};
pub use traits::{
    CartStore,
    Catalog,
    ClaimOutcome,
    OrderStore,
    PaymentProvider,
    PaymentProviderError,
    ProviderTransfer,
    ShopDatabase,
    StoreError,
    VoucherStore,
};
