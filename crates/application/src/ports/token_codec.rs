//! Token codec port

use tessera_domain::{DecodeError, Token, TokenClaims};

/// Extracts claims from a session token.
///
/// Decoding is local and does not verify the signature; the backend remains
/// the authority on whether a token is accepted.
pub trait TokenCodec: Send + Sync {
    /// Decodes `token` into its claims.
    ///
    /// # Errors
    /// Returns [`DecodeError`] if the token is malformed or a claim is missing.
    fn decode(&self, token: &Token) -> Result<TokenClaims, DecodeError>;
}
