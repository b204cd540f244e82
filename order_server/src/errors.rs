use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use order_engine::{ErrorKind, OrderFlowError, VoucherApiError};
use thiserror::Error;

/// What clients see when something unexpected went wrong. The details go to the log instead.
pub const GENERIC_SERVER_ERROR: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    OrderFlowError(#[from] OrderFlowError),
    #[error("{0}")]
    VoucherError(#[from] VoucherApiError),
}

impl ServerError {
    /// The engine's classification of the error, where there is one.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OrderFlowError(e) => e.kind(),
            Self::VoucherError(e) => e.kind(),
            Self::InvalidRequestPath(_) => ErrorKind::Validation,
            Self::AuthenticationError(AuthError::InsufficientPermissions(_)) => ErrorKind::Forbidden,
            Self::AuthenticationError(_) => ErrorKind::Validation,
            Self::InitializeError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => ErrorKind::Server,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            },
            _ => status_for_kind(self.kind()),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.kind() {
            ErrorKind::Server | ErrorKind::ExternalService => {
                error!("💻️ Request failed with an internal error. {self}");
                GENERIC_SERVER_ERROR.to_string()
            },
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": message }).to_string())
    }
}

pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StateConflict => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::ExternalService => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Access token has expired.")]
    TokenExpired,
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The API key is missing or invalid.")]
    InvalidApiKey,
}
