//! Error types for Qanda
//!
//! One enum covers request validation, authorization, storage and the
//! multi-step mutation failures of the voting core.

use hyper::StatusCode;

/// Main error type for Qanda operations
#[derive(Debug, thiserror::Error)]
pub enum QandaError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A later step of a vote or accept failed and the earlier steps
    /// could not be rolled back. Aggregates may disagree with the ledger.
    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QandaError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PartialFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for JSON error bodies
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DB_ERROR",
            Self::PartialFailure(_) => "PARTIAL_FAILURE",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<std::io::Error> for QandaError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for QandaError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for QandaError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<bson::oid::Error> for QandaError {
    fn from(err: bson::oid::Error) -> Self {
        Self::BadRequest(format!("Invalid id: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for QandaError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("JWT error: {}", err))
    }
}

/// Result type alias for Qanda operations
pub type Result<T> = std::result::Result<T, QandaError>;
