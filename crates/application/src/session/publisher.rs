//! Session state fan-out.

use tessera_domain::SessionState;
use tokio::sync::{broadcast, watch};

/// Capacity of the per-transition event channel.
const EVENT_CAPACITY: usize = 64;

/// Re-emits every session snapshot to observers.
///
/// Two views are offered: a lossy event stream with one message per
/// transition, and a latest-value channel for UI layers that only render
/// the current state.
#[derive(Debug)]
pub struct StatePublisher {
    latest: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionState>,
}

impl StatePublisher {
    /// Creates a publisher whose current value is `initial`.
    #[must_use]
    pub fn new(initial: SessionState) -> Self {
        let (latest, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { latest, events }
    }

    /// Publishes `snapshot` to every observer.
    pub fn publish(&self, snapshot: SessionState) {
        // No receivers is fine.
        let _ = self.events.send(snapshot.clone());
        self.latest.send_replace(snapshot);
    }

    /// Event stream with one snapshot per transition.
    ///
    /// Receivers that fall more than 64 snapshots behind skip ahead.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.events.subscribe()
    }

    /// Latest-value view.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.latest.subscribe()
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.latest.borrow().clone()
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new(SessionState::initial())
    }
}
