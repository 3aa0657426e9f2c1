//! Domain-level error types for auto-main-status.
//!
//! All errors are typed with `thiserror` and carry enough context to be
//! printed directly to the user.

use thiserror::Error;

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Failed to open or query the record store.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid or corrupted data in the record store, or an unknown record.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// JSON parsing or serialization failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a database error from rusqlite error.
    pub fn database(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a database error for a poisoned connection lock.
    pub fn lock_poisoned() -> Self {
        Self::Database {
            message: "Record store connection lock poisoned".into(),
            source: None,
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
