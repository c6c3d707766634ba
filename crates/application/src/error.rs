//! Application error types

use thiserror::Error;
use tessera_domain::DecodeError;

/// The identity backend could not be reached or refused the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure before a response was received.
    #[error("{operation} request failed: {message}")]
    Network {
        /// `login` or `refresh`.
        operation: &'static str,
        /// Transport error description.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("{operation} failed with HTTP {status}")]
    Status {
        /// `login` or `refresh`.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, for logs.
        detail: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid {operation} response: {message}")]
    InvalidResponse {
        /// `login` or `refresh`.
        operation: &'static str,
        /// Parser message.
        message: String,
    },
}

impl BackendError {
    /// HTTP status, if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The session store could not read or write the credential.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Failures surfaced through the `error` field of the session state.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A received or persisted token could not be decoded.
    #[error("invalid token: {0}")]
    Decode(#[from] DecodeError),

    /// Login or refresh call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The credential could not be persisted.
    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),

    /// `login()` was called while a login or refresh was in flight.
    #[error("login already in progress")]
    LoginInProgress,

    /// MFA completion arrived with no challenge outstanding.
    #[error("no multi-factor challenge is pending")]
    NoMfaPending,

    /// The token expired before a refresh could be scheduled.
    #[error("session expired")]
    Expired,

    /// A success response carried no token.
    #[error("backend response did not include a token")]
    MissingToken,
}

/// Result type alias for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;
