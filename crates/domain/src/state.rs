//! Session state machine types.
//!
//! [`SessionPhase`] is the state of the session lifecycle and
//! [`Transition`] names every edge between phases. [`SessionState`] is the
//! snapshot published to observers after each transition.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{TokenClaims, UserIdentity};

/// Lifecycle phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session.
    #[default]
    Unauthenticated,
    /// Login request in flight.
    Authenticating,
    /// Backend asked for a second factor; waiting for the completion token.
    AwaitingMfa,
    /// Session established.
    Authenticated,
    /// Refresh request in flight.
    RefreshingCredential,
}

impl SessionPhase {
    /// Returns true while a login or refresh network call is outstanding.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Authenticating | Self::RefreshingCredential)
    }

    /// Applies `transition`, returning the new phase if it is legal here.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if `transition` has no edge out of `self`.
    pub fn apply(self, transition: Transition) -> Result<Self, InvalidTransition> {
        if transition.allowed_from(self) {
            Ok(transition.target())
        } else {
            Err(InvalidTransition {
                from: self,
                transition,
            })
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::AwaitingMfa => "awaiting_mfa",
            Self::Authenticated => "authenticated",
            Self::RefreshingCredential => "refreshing_credential",
        })
    }
}

/// Named edges of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Startup found a valid persisted token.
    InitHydrate,
    /// Startup found no usable token.
    InitEmpty,
    /// `login()` was called.
    LoginStart,
    /// Backend requires a second factor.
    LoginMfa,
    /// Backend issued a token.
    LoginSuccess,
    /// Backend rejected the login or was unreachable.
    LoginFailure,
    /// The MFA completion callback supplied a token.
    MfaComplete,
    /// The proactive refresh is due.
    RefreshDue,
    /// Backend issued a fresh token.
    RefreshSuccess,
    /// Backend rejected the refresh.
    RefreshFailure,
    /// The token was already inside the lead window when scheduling.
    RefreshExpiredImmediate,
    /// Explicit sign-out.
    Logout,
    /// A token could not be decoded.
    DecodeFailure,
}

impl Transition {
    /// Stable kebab-case name, used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitHydrate => "init-hydrate",
            Self::InitEmpty => "init-empty",
            Self::LoginStart => "login-start",
            Self::LoginMfa => "login-mfa",
            Self::LoginSuccess => "login-success",
            Self::LoginFailure => "login-failure",
            Self::MfaComplete => "mfa-complete",
            Self::RefreshDue => "refresh-due",
            Self::RefreshSuccess => "refresh-success",
            Self::RefreshFailure => "refresh-failure",
            Self::RefreshExpiredImmediate => "refresh-expired-immediate",
            Self::Logout => "logout",
            Self::DecodeFailure => "decode-failure",
        }
    }

    /// Guard: can this transition fire from `phase`?
    #[must_use]
    pub const fn allowed_from(self, phase: SessionPhase) -> bool {
        use SessionPhase as P;
        match self {
            Self::InitHydrate | Self::InitEmpty => matches!(phase, P::Unauthenticated),
            Self::LoginStart => {
                matches!(phase, P::Unauthenticated | P::AwaitingMfa | P::Authenticated)
            }
            Self::LoginMfa | Self::LoginSuccess | Self::LoginFailure => {
                matches!(phase, P::Authenticating)
            }
            Self::MfaComplete => matches!(phase, P::AwaitingMfa),
            Self::RefreshDue => matches!(phase, P::Authenticated),
            Self::RefreshSuccess | Self::RefreshFailure => {
                matches!(phase, P::RefreshingCredential)
            }
            // Scheduling and decoding happen inside every completion path.
            Self::RefreshExpiredImmediate | Self::Logout | Self::DecodeFailure => true,
        }
    }

    /// Phase reached after this transition.
    #[must_use]
    pub const fn target(self) -> SessionPhase {
        use SessionPhase as P;
        match self {
            Self::InitHydrate | Self::LoginSuccess | Self::MfaComplete | Self::RefreshSuccess => {
                P::Authenticated
            }
            Self::LoginStart => P::Authenticating,
            Self::LoginMfa => P::AwaitingMfa,
            Self::RefreshDue => P::RefreshingCredential,
            Self::InitEmpty
            | Self::LoginFailure
            | Self::RefreshFailure
            | Self::RefreshExpiredImmediate
            | Self::Logout
            | Self::DecodeFailure => P::Unauthenticated,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transition was attempted from a phase that has no such edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {transition} in phase {from}")]
pub struct InvalidTransition {
    /// Phase the session was in.
    pub from: SessionPhase,
    /// Rejected transition.
    pub transition: Transition,
}

/// Snapshot of the session, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// True once a token has been decoded and persisted.
    pub is_authenticated: bool,
    /// Identity from the current token.
    pub user: Option<UserIdentity>,
    /// Roles from the current token.
    pub roles: BTreeSet<String>,
    /// True while startup or a login is in progress.
    pub loading: bool,
    /// Last user-visible failure.
    pub error: Option<String>,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
}

impl SessionState {
    /// State before the persisted session has been inspected.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            roles: BTreeSet::new(),
            loading: true,
            error: None,
            phase: SessionPhase::Unauthenticated,
        }
    }

    /// Settled signed-out state.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            roles: BTreeSet::new(),
            loading: false,
            error: None,
            phase: SessionPhase::Unauthenticated,
        }
    }

    /// Authenticated state derived from `claims`.
    #[must_use]
    pub fn authenticated(claims: &TokenClaims) -> Self {
        Self {
            is_authenticated: true,
            user: Some(claims.user.clone()),
            roles: claims.roles.clone(),
            loading: false,
            error: None,
            phase: SessionPhase::Authenticated,
        }
    }

    /// Returns true if `role` is among the current roles.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}
