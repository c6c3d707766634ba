//! Host callbacks: browser navigation and the MFA hook.

use tessera_domain::Token;
use url::Url;

/// Sends the user agent to an external URL.
pub trait Navigator: Send + Sync {
    /// Navigates to `url`. Called once per OAuth flow.
    fn navigate(&self, url: &Url);
}

impl<F> Navigator for F
where
    F: Fn(&Url) + Send + Sync,
{
    fn navigate(&self, url: &Url) {
        self(url);
    }
}

/// Details passed to the host when the backend asks for a second factor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MfaChallenge {
    /// Partial token from the login response, if the backend sent one.
    pub ticket: Option<Token>,
}

/// Host-provided second-factor flow.
///
/// The hook only starts the flow; the host reports the result through
/// `SessionEngine::complete_mfa`.
pub trait MfaHook: Send + Sync {
    /// Starts the second-factor flow.
    fn challenge(&self, challenge: &MfaChallenge);
}

impl<F> MfaHook for F
where
    F: Fn(&MfaChallenge) + Send + Sync,
{
    fn challenge(&self, challenge: &MfaChallenge) {
        self(challenge);
    }
}
