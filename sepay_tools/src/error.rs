use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SepayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach SePay: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("SePay rejected the API key")]
    Unauthorized,
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Invalid currency amount: {0}")]
    InvalidAmount(String),
}
