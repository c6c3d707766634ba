//! Tessera Domain - Core session types
//!
//! This crate defines the domain model for the Tessera session manager.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod config;
pub mod error;
pub mod state;

pub use auth::{Credentials, Token, TokenClaims, UserIdentity};
pub use config::{
    DEFAULT_CREDENTIAL_NAME, DEFAULT_REFRESH_LEAD_TIME, DEFAULT_TOKEN_TTL_DAYS, Endpoints,
    SessionConfig,
};
pub use error::{ConfigError, ConfigResult, DecodeError};
pub use state::{InvalidTransition, SessionPhase, SessionState, Transition};
