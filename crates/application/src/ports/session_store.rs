//! Session store port
//!
//! Defines the interface for persisting the session credential.

use async_trait::async_trait;
use tessera_domain::Token;

use crate::error::StoreResult;

/// Durable storage for the single session credential.
///
/// Implementations keep at most one token, under the configured credential
/// name, and stop returning it once its time-to-live has elapsed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the stored token.
    ///
    /// # Returns
    /// `None` if nothing is stored or the stored token has outlived its TTL.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    async fn get(&self) -> StoreResult<Option<Token>>;

    /// Stores `token`, replacing any previous one.
    ///
    /// # Arguments
    /// * `token` - The credential to persist
    /// * `ttl_days` - Days until the stored value expires
    ///
    /// # Errors
    /// Returns an error if the token cannot be written.
    async fn set(&self, token: &Token, ttl_days: u32) -> StoreResult<()>;

    /// Removes the stored token. Removing a missing token is not an error.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be modified.
    async fn delete(&self) -> StoreResult<()>;
}
