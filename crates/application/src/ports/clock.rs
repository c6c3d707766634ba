//! Wall-clock source for token expiry

use chrono::{DateTime, Utc};

/// Source of "now" for expiry checks and refresh deadlines.
///
/// Stores compare retention deadlines against it and the refresh scheduler
/// measures the delay until a token's lead window opens.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// True once `deadline` is no longer in the future.
    fn has_passed(&self, deadline: DateTime<Utc>) -> bool {
        deadline <= self.now()
    }
}
