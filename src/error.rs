// Error taxonomy shared by the cookie store, the HTTP wrapper and the
// domain services. The UI layer wraps these in `anyhow` and prints them;
// the local web server maps them onto status codes.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Cookie file is missing or unreadable.
    #[error("not logged in, please log in first ({0})")]
    NotAuthenticated(String),

    /// Cookie file exists but does not hold a cookie list.
    #[error("cookie file is corrupt: {0}")]
    CorruptState(String),

    #[error("failed to persist cookies: {0}")]
    PersistenceError(String),

    #[error("failed to serialize request body: {0}")]
    SerializationError(String),

    #[error("request failed: {0}")]
    NetworkError(String),

    #[error("request timed out after {0}s")]
    RequestTimeout(u64),

    #[error("remote API returned {status}: {message}")]
    RemoteError { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    DecodeError(String),
}

impl ApiError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        ApiError::RemoteError {
            status,
            message: message.into(),
        }
    }

    /// Numeric status of a remote failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RemoteError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
