//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Transport failures carry the exact user-facing texts the UI shows;
/// server-side rejections carry the server's literal message where one
/// was provided.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Request timed out. The server or database may be unreachable.")]
    Timeout,

    #[error("Can't reach the server. Is it running? If you use the cloud database, check the connection or switch to demo mode.")]
    Unreachable,

    #[error("Request cancelled")]
    Cancelled,

    #[error("{0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an authorization error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// True when the failure happened before the server could answer
    /// (unreachable host, timeout, cancelled request).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable | Self::Cancelled)
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(Error::Timeout.is_transport());
        assert!(Error::Unreachable.is_transport());
        assert!(Error::Cancelled.is_transport());
        assert!(!Error::auth("nope").is_transport());
        assert!(!Error::not_found("missing").is_transport());
    }

    #[test]
    fn test_auth_message_is_verbatim() {
        let err = Error::auth("User already exists");
        assert_eq!(err.to_string(), "User already exists");
    }

    #[test]
    fn test_timeout_message() {
        assert!(Error::Timeout.to_string().contains("timed out"));
    }
}
