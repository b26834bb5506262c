//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation. The
//! variants follow the hub's failure taxonomy: everything except
//! [`Error::Connection`] and [`Error::Io`] is reported to the caller as a
//! failure envelope, the rest propagate out of the tool.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the hub.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input or configuration (bad identifier, wrong type).
    #[error("{0}")]
    Validation(String),

    /// Unknown tool or protocol method.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure reported by a backend driver. Message kept verbatim.
    #[error("{0}")]
    Backend(String),

    /// A backend call exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A backend handle could not be constructed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Fatal errors escape the tool boundary instead of becoming envelopes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Io(_))
    }

    /// Short machine-readable kind, used for health tracking and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Backend(_) => "backend",
            Error::Timeout(_) => "timeout",
            Error::Connection(_) => "connection",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // Keep the server's own message ("relation \"x\" does not exist")
            sqlx::Error::Database(db) => Error::Backend(db.message().to_string()),
            other => Error::Backend(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Backend(err.to_string())
    }
}
