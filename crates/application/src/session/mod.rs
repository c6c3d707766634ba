//! Session lifecycle core

mod engine;
mod publisher;
mod scheduler;

pub use engine::{SessionEngine, SessionPorts};
pub use publisher::StatePublisher;
pub use scheduler::{RefreshScheduler, ScheduleOutcome};
