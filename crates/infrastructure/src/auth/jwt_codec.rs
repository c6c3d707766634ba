//! Compact JWT claim decoding.
//!
//! Reads the payload of a `header.payload.signature` token without checking
//! the signature. The backend verifies tokens; the client only needs the
//! identity, roles and expiry to drive the session.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tessera_application::ports::TokenCodec;
use tessera_domain::{DecodeError, Token, TokenClaims, UserIdentity};

/// Decodes compact JWTs into [`TokenClaims`].
///
/// | claim   | meaning                                                  |
/// |---------|----------------------------------------------------------|
/// | `user`  | identity payload, any JSON value (falls back to `sub`)   |
/// | `roles` | array of strings; absent or `null` means no roles        |
/// | `exp`   | expiry, seconds since the Unix epoch (integer or float)  |
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtTokenCodec;

impl JwtTokenCodec {
    /// Creates a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TokenCodec for JwtTokenCodec {
    fn decode(&self, token: &Token) -> Result<TokenClaims, DecodeError> {
        let payload = payload(token.as_str())?;
        let user = identity(&payload)?;
        let roles = roles(&payload)?;
        let expiry = expiry(&payload)?;
        Ok(TokenClaims::new(user, roles, expiry))
    }
}

fn payload(token: &str) -> Result<Map<String, Value>, DecodeError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::Malformed(parts.len()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DecodeError::Json(format!(
            "expected an object, found {}",
            kind(&other)
        ))),
        Err(e) => Err(DecodeError::Json(e.to_string())),
    }
}

fn identity(payload: &Map<String, Value>) -> Result<UserIdentity, DecodeError> {
    payload
        .get("user")
        .filter(|v| !v.is_null())
        .or_else(|| payload.get("sub").filter(|v| !v.is_null()))
        .cloned()
        .map(UserIdentity::new)
        .ok_or(DecodeError::MissingClaim("user"))
}

fn roles(payload: &Map<String, Value>) -> Result<Vec<String>, DecodeError> {
    match payload.get("roles") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(String::from)
                    .ok_or_else(|| DecodeError::InvalidClaim {
                        claim: "roles",
                        reason: format!("expected strings, found {}", kind(item)),
                    })
            })
            .collect(),
        Some(other) => Err(DecodeError::InvalidClaim {
            claim: "roles",
            reason: format!("expected an array, found {}", kind(other)),
        }),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn expiry(payload: &Map<String, Value>) -> Result<DateTime<Utc>, DecodeError> {
    let exp = payload.get("exp").ok_or(DecodeError::MissingClaim("exp"))?;
    let invalid = |reason: &str| DecodeError::InvalidClaim {
        claim: "exp",
        reason: reason.to_string(),
    };

    let expiry = if let Some(secs) = exp.as_i64() {
        DateTime::from_timestamp(secs, 0)
    } else if let Some(secs) = exp.as_f64() {
        if !secs.is_finite() || secs.abs() > 1e15 {
            return Err(invalid("out of range"));
        }
        DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
    } else {
        return Err(invalid(&format!("expected a number, found {}", kind(exp))));
    };
    expiry.ok_or_else(|| invalid("out of range"))
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
