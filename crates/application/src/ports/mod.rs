//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait that can be implemented by adapters in the infrastructure layer.

mod backend;
mod clock;
mod navigator;
mod session_store;
mod timer;
mod token_codec;

pub use backend::{AuthBackend, LoginResponse, RefreshResponse};
pub use clock::Clock;
pub use navigator::{MfaChallenge, MfaHook, Navigator};
pub use session_store::SessionStore;
pub use timer::{Timer, TimerHandle, TimerTask};
pub use token_codec::TokenCodec;
