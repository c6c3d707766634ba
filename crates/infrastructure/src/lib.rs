//! Tessera Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer.

pub mod adapters;
pub mod auth;
pub mod persistence;

pub use adapters::{ReqwestAuthBackend, SystemClock, TokioTimer};
pub use auth::JwtTokenCodec;
pub use persistence::{FileSessionStore, MemorySessionStore};
