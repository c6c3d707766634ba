//! Domain error types

use thiserror::Error;

/// A session token could not be turned into claims.
///
/// Decode failures are always fatal to the session that produced the token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The token does not have the `header.payload.signature` shape.
    #[error("malformed token: expected 3 segments, found {0}")]
    Malformed(usize),

    /// The payload segment is not valid base64url.
    #[error("token payload is not valid base64url: {0}")]
    Base64(String),

    /// The payload is not a JSON object.
    #[error("token payload is not valid JSON: {0}")]
    Json(String),

    /// A required claim is absent.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// A claim is present but has the wrong shape or range.
    #[error("invalid claim `{claim}`: {reason}")]
    InvalidClaim {
        /// Claim name.
        claim: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Invalid or incomplete session configuration.
///
/// Raised when the configuration is built, never at call time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No base URL was supplied.
    #[error("base URL is required")]
    MissingBaseUrl,

    /// The base URL cannot be parsed or is not http(s).
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl {
        /// The offending value.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// An endpoint path is empty.
    #[error("endpoint `{0}` is required")]
    MissingEndpoint(&'static str),

    /// An endpoint path does not form a valid URL with the base.
    #[error("endpoint `{name}` does not form a valid URL: {reason}")]
    InvalidEndpoint {
        /// Endpoint name.
        name: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A required environment variable is unset.
    #[error("{0} is required")]
    MissingVar(&'static str),

    /// An environment variable or field holds an unusable value.
    #[error("{name}: {reason}")]
    InvalidValue {
        /// Variable or field name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type alias for configuration construction.
pub type ConfigResult<T> = Result<T, ConfigError>;
