use shop_common::Vnd;
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    traits::{PaymentProviderError, StoreError},
};

/// The coarse classification every engine error falls into. The HTTP layer maps these onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Forbidden,
    ExternalService,
    Server,
}

/// The reasons the voucher evaluator can turn a voucher down. Every rejection happens before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoucherRejection {
    #[error("Voucher {0} is invalid or has expired")]
    VoucherInvalidOrExpired(String),
    #[error("You have not claimed voucher {0}")]
    VoucherNotClaimed(String),
    #[error("You have already used voucher {0} the maximum number of times")]
    VoucherUserLimitReached(String),
    #[error("Voucher {0} has been fully redeemed")]
    VoucherGloballyExhausted(String),
    #[error("The order total must be at least {minimum} to use this voucher")]
    OrderBelowMinimum { code: String, minimum: Vnd },
}

impl VoucherRejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VoucherInvalidOrExpired(_) => ErrorKind::NotFound,
            Self::VoucherNotClaimed(_) | Self::OrderBelowMinimum { .. } => ErrorKind::Validation,
            Self::VoucherUserLimitReached(_) | Self::VoucherGloballyExhausted(_) => ErrorKind::StateConflict,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("{0}")]
    StoreError(StoreError),
    #[error("{0}")]
    VoucherRejected(#[from] VoucherRejection),
    #[error("Invalid order request. {0}")]
    InvalidRequest(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Not enough stock for {product}: requested {requested}, only {available} available")]
    InsufficientStock { product: String, requested: i64, available: i64 },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No order reference was found in the transfer content")]
    OrderReferenceNotFound,
    #[error("You do not have access to order {0}")]
    Forbidden(OrderId),
    #[error("Order {order_id} cannot be cancelled because it is {status}")]
    IllegalCancellation { order_id: OrderId, status: OrderStatusType },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    IllegalTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Could not allocate a unique order reference")]
    ReferenceExhausted,
    #[error("Payment provider error. {0}")]
    ProviderError(#[from] PaymentProviderError),
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StoreError(e) => e.kind(),
            Self::VoucherRejected(r) => r.kind(),
            Self::InvalidRequest(_) | Self::OrderReferenceNotFound => ErrorKind::Validation,
            Self::ProductNotFound(_) | Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientStock { .. } | Self::IllegalCancellation { .. } | Self::IllegalTransition { .. } => {
                ErrorKind::StateConflict
            },
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ReferenceExhausted => ErrorKind::Server,
            Self::ProviderError(_) => ErrorKind::ExternalService,
        }
    }
}

impl From<StoreError> for OrderFlowError {
    /// Guard failures inside a transaction surface as the same errors the pre-checks produce.
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InsufficientStock { product, requested, available } => {
                Self::InsufficientStock { product, requested, available }
            },
            StoreError::VoucherUserLimitReached(code) => VoucherRejection::VoucherUserLimitReached(code).into(),
            StoreError::VoucherGloballyExhausted(code) => VoucherRejection::VoucherGloballyExhausted(code).into(),
            StoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            other => Self::StoreError(other),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum VoucherApiError {
    #[error("{0}")]
    StoreError(#[from] StoreError),
    #[error("{0}")]
    Rejected(#[from] VoucherRejection),
    #[error("Voucher {0} does not exist")]
    VoucherNotFound(String),
    #[error("Invalid voucher. {0}")]
    InvalidVoucher(String),
    #[error("A voucher with code {0} already exists")]
    DuplicateCode(String),
}

impl VoucherApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StoreError(e) => e.kind(),
            Self::Rejected(r) => r.kind(),
            Self::VoucherNotFound(_) => ErrorKind::NotFound,
            Self::InvalidVoucher(_) | Self::DuplicateCode(_) => ErrorKind::Validation,
        }
    }
}
