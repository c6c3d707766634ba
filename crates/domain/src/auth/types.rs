//! Credential and claim types

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque session credential issued by the identity backend.
///
/// `Debug` only shows a short preview so tokens stay out of logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token string, for use as a bearer credential.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token string is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First 8 characters followed by `...`, or the whole token if short.
    #[must_use]
    pub fn preview(&self) -> String {
        if self.0.len() > 12 {
            let cut = self
                .0
                .char_indices()
                .nth(8)
                .map_or(self.0.len(), |(idx, _)| idx);
            format!("{}...", &self.0[..cut])
        } else {
            self.0.clone()
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.preview()).finish()
    }
}

impl From<String> for Token {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Token {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Login credentials, sent verbatim as the JSON body of the login request.
///
/// The shape is backend-defined. `Debug` never prints the contents.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(Value);

impl Credentials {
    /// Wraps an arbitrary JSON payload.
    #[must_use]
    pub const fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Builds the common `{"username": .., "password": ..}` payload.
    #[must_use]
    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "username": username.into(),
            "password": password.into(),
        }))
    }

    /// The JSON payload.
    #[must_use]
    pub const fn as_json(&self) -> &Value {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

impl From<Value> for Credentials {
    fn from(payload: Value) -> Self {
        Self(payload)
    }
}

/// Identity payload carried by a token. Structure is backend-defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(Value);

impl UserIdentity {
    /// Wraps an identity payload.
    #[must_use]
    pub const fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// The string form, when the payload is a plain JSON string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// The raw payload.
    #[must_use]
    pub const fn as_json(&self) -> &Value {
        &self.0
    }
}

impl From<&str> for UserIdentity {
    fn from(name: &str) -> Self {
        Self(Value::String(name.to_string()))
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// Claims decoded from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Who the token was issued to.
    pub user: UserIdentity,
    /// Granted roles.
    pub roles: BTreeSet<String>,
    /// Absolute expiry.
    pub expiry: DateTime<Utc>,
}

impl TokenClaims {
    /// Creates claims from any iterator of role names.
    #[must_use]
    pub fn new<I, S>(user: UserIdentity, roles: I, expiry: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user,
            roles: roles.into_iter().map(Into::into).collect(),
            expiry,
        }
    }

    /// Returns true if the claims grant `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}
