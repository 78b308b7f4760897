//! Error types shared by every firestore-kit crate.

use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client error kinds.
///
/// Validation and state errors are raised before any request leaves the
/// process. Remote errors are whatever the service reported, passed through
/// untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An argument had the wrong shape (bad path, conflicting options, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The batch has already been committed
    #[error("batch is closed")]
    Closed,

    /// The owning database has no active service connection
    #[error("Must have active connection to service")]
    NotConnected,

    /// Failure reported by the remote service
    #[error("Remote error {code}: {message}")]
    Remote {
        /// Service status code
        code: i32,
        /// Service supplied message
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Shorthand for [`Error::Remote`].
    pub fn remote(code: i32, message: impl Into<String>) -> Self {
        Error::Remote {
            code,
            message: message.into(),
        }
    }

    /// Returns true for errors raised locally before any I/O happened.
    pub fn is_local(&self) -> bool {
        !matches!(self, Error::Remote { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
