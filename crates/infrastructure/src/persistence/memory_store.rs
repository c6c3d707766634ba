//! In-process session store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tessera_application::StoreResult;
use tessera_application::ports::{Clock, SessionStore};
use tessera_domain::Token;

use super::expires_at;
use crate::adapters::SystemClock;

/// Keeps the credential in memory, honouring its retention period.
///
/// Nothing survives the process. Useful for tests and for embedders that
/// persist the session themselves.
pub struct MemorySessionStore {
    clock: Arc<dyn Clock>,
    entry: Mutex<Option<(Token, DateTime<Utc>)>>,
}

impl MemorySessionStore {
    /// Creates an empty store on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Creates an empty store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entry: Mutex::new(None),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("entry", &self.entry.lock())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self) -> StoreResult<Option<Token>> {
        let mut entry = self.entry.lock();
        if entry
            .as_ref()
            .is_some_and(|(_, expires)| self.clock.has_passed(*expires))
        {
            *entry = None;
        }
        Ok(entry.as_ref().map(|(token, _)| token.clone()))
    }

    async fn set(&self, token: &Token, ttl_days: u32) -> StoreResult<()> {
        let expires = expires_at(self.clock.now(), ttl_days);
        *self.entry.lock() = Some((token.clone(), expires));
        Ok(())
    }

    async fn delete(&self) -> StoreResult<()> {
        *self.entry.lock() = None;
        Ok(())
    }
}
