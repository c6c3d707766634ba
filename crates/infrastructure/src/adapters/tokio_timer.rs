//! Tokio-backed timer adapter

use std::time::Duration;

use tessera_application::ports::{Timer, TimerHandle, TimerTask};

/// Runs timer tasks on the current tokio runtime.
///
/// Each scheduled task is a spawned sleep; cancelling aborts it. Must be
/// used from within a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TokioTimer {
    /// Creates a new tokio timer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        let abort = join.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}
