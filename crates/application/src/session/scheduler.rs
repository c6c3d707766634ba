//! Proactive refresh scheduling.
//!
//! The scheduler owns at most one pending refresh. Scheduling a new one
//! always cancels the previous one first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tessera_domain::TokenClaims;

use crate::ports::{Clock, Timer, TimerHandle, TimerTask};

/// Result of [`RefreshScheduler::schedule_refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A refresh will run at `due_at`.
    Scheduled {
        /// Instant the refresh task fires.
        due_at: DateTime<Utc>,
    },
    /// The token is already inside the lead window. Nothing was scheduled.
    AlreadyExpired,
}

struct PendingRefresh {
    id: u64,
    due_at: DateTime<Utc>,
    handle: TimerHandle,
}

/// Owns the single pending refresh timer.
pub struct RefreshScheduler {
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    pending: Arc<Mutex<Option<PendingRefresh>>>,
    next_id: AtomicU64,
}

impl RefreshScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, timer: Arc<dyn Timer>) -> Self {
        Self {
            clock,
            timer,
            pending: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Schedules `on_due` to run `lead_time` before `claims.expiry`.
    ///
    /// Any pending refresh is cancelled first, whatever the outcome.
    pub fn schedule_refresh(
        &self,
        claims: &TokenClaims,
        lead_time: Duration,
        on_due: TimerTask,
    ) -> ScheduleOutcome {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.handle.cancel();
        }

        let now = self.clock.now();
        let due_at = TimeDelta::from_std(lead_time)
            .ok()
            .and_then(|lead| claims.expiry.checked_sub_signed(lead));
        let Some(due_at) = due_at else {
            return ScheduleOutcome::AlreadyExpired;
        };
        let delay = match (due_at - now).to_std() {
            Ok(delay) if !delay.is_zero() => delay,
            _ => {
                tracing::debug!(expiry = %claims.expiry, "token inside refresh lead window");
                return ScheduleOutcome::AlreadyExpired;
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::downgrade(&self.pending);
        let task: TimerTask = Box::pin(async move {
            // Leave the slot before running, so a reschedule from `on_due`
            // does not cancel the task that is running it.
            if let Some(slot) = slot.upgrade() {
                let mut current = slot.lock();
                if current.as_ref().is_some_and(|p| p.id == id) {
                    current.take();
                }
            }
            on_due.await;
        });

        let handle = self.timer.schedule(delay, task);
        *pending = Some(PendingRefresh { id, due_at, handle });
        tracing::debug!(%due_at, delay_secs = delay.as_secs(), "refresh scheduled");
        ScheduleOutcome::Scheduled { due_at }
    }

    /// Cancels the pending refresh, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.handle.cancel();
            tracing::debug!(due_at = %previous.due_at, "refresh cancelled");
        }
    }

    /// Due instant of the pending refresh.
    #[must_use]
    pub fn pending_due_at(&self) -> Option<DateTime<Utc>> {
        self.pending.lock().as_ref().map(|p| p.due_at)
    }

    /// Returns true if a refresh is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.handle.cancel();
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("pending_due_at", &self.pending_due_at())
            .finish_non_exhaustive()
    }
}
