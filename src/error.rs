//! Error types with HTTP status code mapping.

use hyper::StatusCode;

use crate::http::HttpFailure;

/// Error type for assetdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Auth errors
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Forbidden: cannot {action}")]
    Forbidden { action: String },

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    // List errors
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Page {page} is outside 0..{total_pages}")]
    PageOutOfRange { page: u32, total_pages: u32 },

    // Transport errors
    #[error(transparent)]
    Http(#[from] HttpFailure),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // System errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map error to the HTTP status code it corresponds to.
    ///
    /// Transport failures keep the status the server answered with; failures
    /// that never reached a server map to 503.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated | Error::InvalidCredentials | Error::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,

            Error::PageOutOfRange { .. } | Error::UnknownFilter(_) | Error::UnknownRole(_) => {
                StatusCode::BAD_REQUEST
            }

            Error::Http(failure) => failure.status.unwrap_or(StatusCode::SERVICE_UNAVAILABLE),

            Error::Config(_) | Error::InvalidUrl(_) | Error::Json(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Result type alias using assetdesk's Error.
pub type Result<T> = std::result::Result<T, Error>;
