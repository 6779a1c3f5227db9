// src/error.rs

//! Unified error handling for the transcription handlers.

use std::fmt;

use thiserror::Error;

/// Result type alias for handler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Every lower-level failure (search index, DynamoDB, SQS, S3) is wrapped into
/// one of these kinds at the component boundary. [`AppError::status_code`] is
/// the only place a kind is mapped to an HTTP status.
#[derive(Error, Debug)]
pub enum AppError {
    /// Search index answered 403, or the caller's access policy is empty
    #[error("{0}")]
    AccessDenied(String),

    /// Malformed input or call ids that did not validate
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid deployment configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Work queue send failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// Any non-403 search index failure
    #[error("Search request failed{}: {body}", .status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    SearchRequest { status: Option<u16>, body: String },

    /// Durable job store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Object store (S3) failure
    #[error("S3 error: {0}")]
    ObjectStore(String),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Index document that does not fit the call record shape
    #[error("Invalid call record {sid}: {message}")]
    InvalidRecord { sid: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a queue error.
    pub fn queue(message: impl fmt::Display) -> Self {
        Self::Queue(message.to_string())
    }

    /// Create a durable store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create an object store error.
    pub fn object_store(message: impl fmt::Display) -> Self {
        Self::ObjectStore(message.to_string())
    }

    /// Create a search request failure with an optional HTTP status.
    pub fn search(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::SearchRequest {
            status,
            body: body.into(),
        }
    }

    /// HTTP status surfaced to the caller for this error kind.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::AccessDenied(_) => 403,
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Configuration(_)
            | AppError::Queue(_)
            | AppError::SearchRequest { .. }
            | AppError::Store(_)
            | AppError::ObjectStore(_)
            | AppError::InvalidRecord { .. }
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Toml(_)
            | AppError::Url(_) => 500,
        }
    }

    /// Whether this is a server-side failure whose detail stays in the logs.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}
