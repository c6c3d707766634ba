//! Host wall clock

use chrono::{DateTime, Utc};
use tessera_application::ports::Clock;

/// Reads the host's UTC time. Used by the stores and the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates the clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
