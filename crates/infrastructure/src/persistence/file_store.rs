//! File-based session store.
//!
//! The credential is kept in `<dir>/<name>.json`:
//! ```json
//! {
//!   "token": "eyJhbGciOi...",
//!   "expires_at": "2026-01-08T00:00:00Z"
//! }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_application::ports::{Clock, SessionStore};
use tessera_application::{StoreError, StoreResult};
use tessera_domain::Token;
use tokio::fs;

use super::expires_at;
use crate::adapters::SystemClock;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    token: Token,
    expires_at: DateTime<Utc>,
}

/// Persists the credential as a small JSON file.
///
/// Writes go to a temporary file that is renamed into place, so readers
/// never see a partial record. A record past its expiry, or one that
/// cannot be parsed, is removed and reported as absent.
pub struct FileSessionStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileSessionStore {
    /// Creates a store for `<dir>/<name>.json` on the system clock.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> Self {
        Self::with_clock(dir, name, Arc::new(SystemClock::new()))
    }

    /// Creates a store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(dir: impl Into<PathBuf>, name: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: dir.into().join(format!("{name}.json")),
            clock,
        }
    }

    /// Path of the credential file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(&self) -> StoreResult<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl std::fmt::Debug for FileSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self) -> StoreResult<Option<Token>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let record: StoredCredential = match serde_json::from_slice(&content) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable session file");
                self.remove().await?;
                return Ok(None);
            }
        };

        if self.clock.has_passed(record.expires_at) {
            tracing::debug!(path = %self.path.display(), expires_at = %record.expires_at, "stored session lapsed");
            self.remove().await?;
            return Ok(None);
        }
        Ok(Some(record.token))
    }

    async fn set(&self, token: &Token, ttl_days: u32) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let record = StoredCredential {
            token: token.clone(),
            expires_at: expires_at(self.clock.now(), ttl_days),
        };
        let content = serde_json::to_vec_pretty(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        // Atomic write: write to tmp file then rename.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &content).await?;
        fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), expires_at = %record.expires_at, "session persisted");
        Ok(())
    }

    async fn delete(&self) -> StoreResult<()> {
        self.remove().await
    }
}
