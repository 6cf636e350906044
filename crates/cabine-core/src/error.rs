//! Error types and result aliases for cabine.
//!
//! This module defines the shared error types used across all cabine components.
//! The first three variants are the caller-visible taxonomy relayed to client
//! connections; the remaining variants are infrastructure failures whose detail
//! belongs in logs, not on the wire.

/// The result type used throughout cabine.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cabine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was malformed or referenced an ineligible resource.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The connection is not authenticated or lacks a required binding.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A key-value store operation failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A room-transport operation failed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new bad-request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates a new unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a new not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the stable machine-readable code relayed to clients.
    ///
    /// Infrastructure variants collapse to `internal`: the client learns that
    /// the operation failed, the logs carry the specifics.
    #[must_use]
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad-request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not-found",
            Self::Store { .. }
            | Self::Transport { .. }
            | Self::Serialization { .. }
            | Self::Internal { .. } => "internal",
        }
    }
}
