//! # Backend contracts
//!
//! The order engine never talks to a database directly. It consumes the traits in this module, and a concrete backend
//! (currently [`crate::SqliteDatabase`]) implements them.
//!
//! * [`Catalog`] resolves products and variants, and applies guarded stock adjustments.
//! * [`VoucherStore`] looks up vouchers and the claims users hold on them.
//! * [`OrderStore`] persists orders and performs the conditional status transitions that make payment reconciliation
//!   idempotent.
//! * [`CartStore`] holds the users' shopping carts.
//! * [`ShopDatabase`] ties the above together and adds the two operations that span several tables in one transaction.
//! * [`PaymentProvider`] is the seam to the external bank-transfer provider.
mod cart_store;
mod catalog;
mod order_store;
mod payment_provider;
mod shop_database;
mod voucher_store;

pub use cart_store::CartStore;
pub use catalog::Catalog;
pub use order_store::OrderStore;
pub use payment_provider::{PaymentProvider, PaymentProviderError, ProviderTransfer};
pub use shop_database::{ShopDatabase, StoreError};
pub use voucher_store::{ClaimOutcome, VoucherStore};
