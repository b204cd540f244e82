//! A thin client for SePay, the Vietnamese bank-transfer notification service.
//!
//! * [`SepayApi`] queries the transaction-search endpoint for transfers whose memo carries a given reference.
//! * [`SepayWebhook`] is the payload SePay pushes when a transfer lands in the receiving account.
//! * [`vietqr_url`] builds the VietQR image link customers scan to pay.
mod api;
mod config;
mod data_objects;
mod error;
mod helpers;

pub use api::SepayApi;
pub use config::{SepayConfig, DEFAULT_SEPAY_API_URL};
pub use data_objects::{SearchResponse, SepayTransaction, SepayWebhook};
pub use error::SepayApiError;
pub use helpers::{memo_carries_reference, parse_sepay_amount, vietqr_url};
