//! Identity backend port
//!
//! The backend exposes two calls: a credential login and a token refresh.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_domain::{Credentials, Token};

use crate::error::BackendError;

/// Body of a successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Issued token. Absent when a second factor is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    /// True if the backend wants a second factor before issuing a token.
    #[serde(rename = "requiresMFA", default)]
    pub requires_mfa: bool,
}

impl LoginResponse {
    /// Response carrying a token.
    #[must_use]
    pub const fn with_token(token: Token) -> Self {
        Self {
            token: Some(token),
            requires_mfa: false,
        }
    }

    /// Response asking for a second factor.
    #[must_use]
    pub const fn mfa_required() -> Self {
        Self {
            token: None,
            requires_mfa: true,
        }
    }
}

/// Body of a successful refresh response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Replacement token.
    pub token: Token,
}

/// Remote identity service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchanges credentials for a token or an MFA challenge.
    ///
    /// # Errors
    /// Returns [`BackendError`] on transport failure or a non-success status.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError>;

    /// Exchanges the current token for a fresh one.
    ///
    /// # Errors
    /// Returns [`BackendError`] on transport failure or a non-success status.
    async fn refresh(&self, token: &Token) -> Result<RefreshResponse, BackendError>;
}
