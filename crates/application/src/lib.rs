//! Tessera Application - Session core and ports
//!
//! This crate defines the application layer with:
//! - Port traits (backend, store, codec, clock, timer, host callbacks)
//! - The session engine, refresh scheduler and state publisher
//! - Application-level error handling

pub mod error;
pub mod ports;
pub mod session;

pub use error::{BackendError, SessionError, StoreError, StoreResult};
pub use ports::{
    AuthBackend, Clock, LoginResponse, MfaChallenge, MfaHook, Navigator, RefreshResponse,
    SessionStore, Timer, TimerHandle, TimerTask, TokenCodec,
};
pub use session::{RefreshScheduler, ScheduleOutcome, SessionEngine, SessionPorts, StatePublisher};
