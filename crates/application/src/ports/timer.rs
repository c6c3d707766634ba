//! Timer port for deferred work.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Work run when a timer fires.
pub type TimerTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Schedules one-shot tasks.
pub trait Timer: Send + Sync {
    /// Runs `task` once after `delay`.
    ///
    /// The task must never run inline, even for a zero delay.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

/// Handle to a scheduled task.
///
/// Dropping the handle leaves the task scheduled; call [`TimerHandle::cancel`]
/// to stop it.
#[derive(Default)]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    /// Handle that runs `cancel` when cancelled.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle with nothing to cancel.
    #[must_use]
    pub const fn detached() -> Self {
        Self { cancel: None }
    }

    /// Cancels the task if it has not fired yet.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}
