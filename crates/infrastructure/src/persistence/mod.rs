//! Session store adapters

mod file_store;
mod memory_store;

pub use file_store::FileSessionStore;
pub use memory_store::MemorySessionStore;

use chrono::{DateTime, TimeDelta, Utc};

/// Instant a credential written at `now` with `ttl_days` retention lapses.
fn expires_at(now: DateTime<Utc>, ttl_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(TimeDelta::days(i64::from(ttl_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
