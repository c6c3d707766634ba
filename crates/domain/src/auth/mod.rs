//! Authentication domain types

mod types;

pub use types::{Credentials, Token, TokenClaims, UserIdentity};
