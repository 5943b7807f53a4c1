//! Error types for sprig.

use axum::http::StatusCode;
use serde_json::json;

/// Boxed error returned by handlers; anything `?`-able converts into it.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while declaring or dispatching routes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Application already initialized")]
    AlreadyInitialized,

    #[error("Application not initialized")]
    Uninitialized,

    #[error("Unresolved route destination: {0}")]
    UnresolvedDestination(String),

    #[error("Application is frozen, nothing can be declared after run()")]
    Frozen,

    #[error("Invalid path pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    #[error("Attribute {name} is not of type {expected}")]
    AttributeType { name: String, expected: &'static str },

    #[error("Attribute {0} is unavailable, its initializer panicked")]
    AttributeUnavailable(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    /// Status code and error type label used when this error ends a request.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::AlreadyInitialized | Error::Uninitialized => {
                (StatusCode::INTERNAL_SERVER_ERROR, "initialization")
            }
            Error::UnresolvedDestination(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unresolved_destination")
            }
            Error::Frozen => (StatusCode::INTERNAL_SERVER_ERROR, "frozen"),
            Error::InvalidPattern { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "invalid_pattern"),
            Error::UnknownAttribute(_)
            | Error::AttributeType { .. }
            | Error::AttributeUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "attribute")
            }
            Error::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "template"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
        }
    }
}

/// JSON error body sent when a request ends in an error.
pub(crate) fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "type": error_type,
            "message": message
        }
    })
}

pub type Result<T> = std::result::Result<T, Error>;
