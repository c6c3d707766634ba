//! Session lifecycle engine.
//!
//! [`SessionEngine`] drives the session state machine: it hydrates from the
//! store, logs in (with an optional second factor), refreshes proactively
//! and signs out. Every transition is logged and published.
//!
//! Two locks guard the session. A synchronous mutex protects the state and
//! is never held across an `.await`. An async operation lock serializes
//! store mutations. Network calls run without either lock, and each result
//! is checked against the session epoch before it is applied, so a result
//! that arrives after a logout or a newer login is discarded.

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tessera_domain::{
    Credentials, SessionConfig, SessionPhase, SessionState, Token, TokenClaims, Transition,
};
use tokio::sync::{broadcast, watch};
use url::Url;

use super::publisher::StatePublisher;
use super::scheduler::{RefreshScheduler, ScheduleOutcome};
use crate::error::SessionError;
use crate::ports::{
    AuthBackend, Clock, LoginResponse, MfaChallenge, MfaHook, Navigator, SessionStore, Timer,
    TimerTask, TokenCodec,
};

/// Collaborators injected into a [`SessionEngine`].
pub struct SessionPorts {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    navigator: Arc<dyn Navigator>,
    mfa_hook: Arc<dyn MfaHook>,
}

impl SessionPorts {
    /// Bundles the required ports. Navigation and the MFA hook default to
    /// logging a warning; set them with [`Self::with_navigator`] and
    /// [`Self::with_mfa_hook`].
    #[must_use]
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn SessionStore>,
        codec: Arc<dyn TokenCodec>,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        Self {
            backend,
            store,
            codec,
            clock,
            timer,
            navigator: Arc::new(UnconfiguredHost),
            mfa_hook: Arc::new(UnconfiguredHost),
        }
    }

    /// Sets the navigator used by [`SessionEngine::start_oauth_flow`].
    #[must_use]
    pub fn with_navigator(mut self, navigator: impl Navigator + 'static) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Sets the hook invoked when the backend asks for a second factor.
    #[must_use]
    pub fn with_mfa_hook(mut self, hook: impl MfaHook + 'static) -> Self {
        self.mfa_hook = Arc::new(hook);
        self
    }
}

impl fmt::Debug for SessionPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPorts").finish_non_exhaustive()
    }
}

struct UnconfiguredHost;

impl Navigator for UnconfiguredHost {
    fn navigate(&self, url: &Url) {
        tracing::warn!(%url, "no navigator configured, dropping OAuth redirect");
    }
}

impl MfaHook for UnconfiguredHost {
    fn challenge(&self, _challenge: &MfaChallenge) {
        tracing::warn!("no MFA hook configured, challenge left pending");
    }
}

struct Session {
    state: SessionState,
    token: Option<Token>,
    epoch: u64,
}

enum Settled {
    Established,
    Expired,
    Superseded,
}

struct Shared {
    config: SessionConfig,
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn SessionStore>,
    codec: Arc<dyn TokenCodec>,
    navigator: Arc<dyn Navigator>,
    mfa_hook: Arc<dyn MfaHook>,
    scheduler: RefreshScheduler,
    publisher: StatePublisher,
    session: Mutex<Session>,
    ops: tokio::sync::Mutex<()>,
}

/// Handle to a client-side authentication session.
///
/// Cloning is cheap; all clones drive the same session. Operations never
/// return errors: failures land in the `error` field of [`SessionState`].
#[derive(Clone)]
pub struct SessionEngine {
    shared: Arc<Shared>,
}

impl SessionEngine {
    /// Creates an engine in the initial loading state.
    ///
    /// Call [`Self::initialize`] to hydrate from the store.
    #[must_use]
    pub fn new(config: SessionConfig, ports: SessionPorts) -> Self {
        let initial = SessionState::initial();
        Self {
            shared: Arc::new(Shared {
                config,
                backend: ports.backend,
                store: ports.store,
                codec: ports.codec,
                navigator: ports.navigator,
                mfa_hook: ports.mfa_hook,
                scheduler: RefreshScheduler::new(ports.clock, ports.timer),
                publisher: StatePublisher::new(initial.clone()),
                session: Mutex::new(Session {
                    state: initial,
                    token: None,
                    epoch: 0,
                }),
                ops: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Restores the persisted session, if any.
    ///
    /// A valid stored token authenticates the session and schedules its
    /// refresh. A stored token that cannot be decoded is deleted and the
    /// failure reported; one that has already lapsed is deleted silently.
    pub async fn initialize(&self) {
        let shared = &self.shared;
        let _ops = shared.ops.lock().await;
        let epoch = {
            let session = shared.session.lock();
            if !Transition::InitEmpty.allowed_from(session.state.phase) {
                tracing::debug!(phase = %session.state.phase, "session already initialized");
                return;
            }
            session.epoch
        };

        let stored = match shared.store.get().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read stored session");
                shared.settle_empty(epoch, Some(SessionError::from(err)));
                return;
            }
        };
        let Some(token) = stored else {
            shared.settle_empty(epoch, None);
            return;
        };

        let claims = match shared.codec.decode(&token) {
            Ok(claims) => claims,
            Err(err) => {
                if !shared.is_current(epoch, Transition::InitEmpty) {
                    tracing::debug!("stored session superseded by a newer login");
                    return;
                }
                tracing::warn!(error = %err, token = %token.preview(), "stored token is invalid");
                shared
                    .clear_session(Transition::DecodeFailure, Some(err.into()))
                    .await;
                return;
            }
        };

        match shared.establish(epoch, token, &claims, Transition::InitHydrate) {
            Settled::Established | Settled::Superseded => {}
            Settled::Expired => {
                tracing::info!(expiry = %claims.expiry, "stored session has lapsed");
                shared
                    .clear_session(Transition::RefreshExpiredImmediate, None)
                    .await;
            }
        }
    }

    /// Logs in with `credentials`.
    ///
    /// Rejected while a login or refresh is already in flight. Starting a
    /// login from an established session or a pending MFA challenge
    /// supersedes it.
    pub async fn login(&self, credentials: Credentials) {
        let shared = &self.shared;
        let epoch = {
            let mut session = shared.session.lock();
            if !Transition::LoginStart.allowed_from(session.state.phase) {
                tracing::warn!(phase = %session.state.phase, "login rejected, another request is in flight");
                session.state.error = Some(SessionError::LoginInProgress.to_string());
                shared.publisher.publish(session.state.clone());
                return;
            }
            session.epoch += 1;
            session.token = None;
            shared.scheduler.cancel();
            shared.apply(&mut session, Transition::LoginStart, |state| {
                *state = SessionState {
                    loading: true,
                    ..SessionState::signed_out()
                };
            });
            session.epoch
        };

        tracing::debug!(url = %shared.config.login_url(), "sending login request");
        match shared.backend.login(&credentials).await {
            Ok(LoginResponse {
                requires_mfa: true,
                token,
            }) => shared.await_mfa(epoch, token),
            Ok(LoginResponse {
                token: Some(token), ..
            }) => shared.complete(epoch, token, Transition::LoginSuccess).await,
            Ok(LoginResponse { token: None, .. }) => {
                shared
                    .fail(epoch, Transition::LoginFailure, SessionError::MissingToken)
                    .await;
            }
            Err(err) => {
                shared
                    .fail(epoch, Transition::LoginFailure, err.into())
                    .await;
            }
        }
    }

    /// Completes a pending multi-factor login with the token issued by the
    /// second-factor flow.
    pub async fn complete_mfa(&self, token: Token) {
        let shared = &self.shared;
        let epoch = {
            let mut session = shared.session.lock();
            if session.state.phase != SessionPhase::AwaitingMfa {
                tracing::warn!(phase = %session.state.phase, "MFA completion rejected");
                session.state.error = Some(SessionError::NoMfaPending.to_string());
                shared.publisher.publish(session.state.clone());
                return;
            }
            session.epoch
        };
        shared.complete(epoch, token, Transition::MfaComplete).await;
    }

    /// Exchanges the current token for a fresh one.
    ///
    /// Runs automatically when the scheduled refresh is due. Does nothing
    /// unless the session is authenticated. A failed refresh signs out.
    pub async fn refresh(&self) {
        self.shared.refresh_for_epoch(None).await;
    }

    /// Signs out: cancels the pending refresh, deletes the stored token and
    /// clears the state. Safe to call repeatedly.
    pub async fn logout(&self) {
        let shared = &self.shared;
        shared.session.lock().epoch += 1;
        let _ops = shared.ops.lock().await;
        shared.clear_session(Transition::Logout, None).await;
    }

    /// Returns true if the current session carries `role`.
    #[must_use]
    pub fn check_permission(&self, role: &str) -> bool {
        self.shared.session.lock().state.has_role(role)
    }

    /// Sends the user agent to the OAuth entry point for `provider`.
    ///
    /// The session state is not touched; the provider redirects back to the
    /// host, which then hydrates or logs in as usual.
    pub fn start_oauth_flow(&self, provider: &str) {
        let url = self.shared.config.oauth_url(provider);
        tracing::info!(provider, %url, "starting OAuth flow");
        self.shared.navigator.navigate(&url);
    }

    /// Current session snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.session.lock().state.clone()
    }

    /// Stream of every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionState> {
        self.shared.publisher.subscribe()
    }

    /// Latest-value view of the session.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.shared.publisher.watch()
    }

    /// Bearer token of the established session.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        let session = self.shared.session.lock();
        if session.state.is_authenticated {
            session.token.clone()
        } else {
            None
        }
    }

    /// Due instant of the scheduled refresh.
    #[must_use]
    pub fn pending_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.shared.scheduler.pending_due_at()
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state())
            .field("scheduler", &self.shared.scheduler)
            .finish_non_exhaustive()
    }
}

fn refresh_task(shared: Weak<Shared>, epoch: u64) -> TimerTask {
    Box::pin(async move {
        if let Some(shared) = shared.upgrade() {
            shared.refresh_for_epoch(Some(epoch)).await;
        }
    })
}

/// Sign-out transition used when persisting a completed session fails.
const fn store_failure_transition(completion: Transition) -> Transition {
    match completion {
        Transition::LoginSuccess => Transition::LoginFailure,
        Transition::RefreshSuccess => Transition::RefreshFailure,
        _ => Transition::Logout,
    }
}

impl Shared {
    /// Applies `transition` to the locked session and publishes the result.
    fn apply(
        &self,
        session: &mut Session,
        transition: Transition,
        update: impl FnOnce(&mut SessionState),
    ) -> bool {
        let from = session.state.phase;
        let to = match from.apply(transition) {
            Ok(to) => to,
            Err(err) => {
                tracing::warn!(error = %err, "session transition rejected");
                return false;
            }
        };
        update(&mut session.state);
        session.state.phase = to;
        tracing::debug!(%transition, %from, %to, epoch = session.epoch, "session transition");
        self.publisher.publish(session.state.clone());
        true
    }

    fn is_current(&self, epoch: u64, transition: Transition) -> bool {
        let session = self.session.lock();
        session.epoch == epoch && transition.allowed_from(session.state.phase)
    }

    fn settle_empty(&self, epoch: u64, error: Option<SessionError>) {
        let mut session = self.session.lock();
        if session.epoch != epoch {
            tracing::debug!("stored session superseded by a newer login");
            return;
        }
        let message = error.map(|err| err.to_string());
        self.apply(&mut session, Transition::InitEmpty, |state| {
            *state = SessionState::signed_out();
            state.error = message;
        });
    }

    fn await_mfa(&self, epoch: u64, ticket: Option<Token>) {
        {
            let mut session = self.session.lock();
            if session.epoch != epoch || !Transition::LoginMfa.allowed_from(session.state.phase) {
                tracing::debug!("discarding stale MFA challenge");
                return;
            }
            self.apply(&mut session, Transition::LoginMfa, |state| {
                state.loading = false;
            });
        }
        tracing::info!("second factor required");
        self.mfa_hook.challenge(&MfaChallenge { ticket });
    }

    /// Decodes, persists and installs a freshly issued token.
    async fn complete(self: &Arc<Self>, epoch: u64, token: Token, transition: Transition) {
        let _ops = self.ops.lock().await;
        if !self.is_current(epoch, transition) {
            tracing::debug!(%transition, "discarding stale token response");
            return;
        }

        let claims = match self.codec.decode(&token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(%transition, error = %err, token = %token.preview(), "issued token is invalid");
                self.clear_session(Transition::DecodeFailure, Some(err.into()))
                    .await;
                return;
            }
        };

        if let Err(err) = self.store.set(&token, self.config.token_ttl_days()).await {
            tracing::warn!(error = %err, "failed to persist session token");
            self.clear_session(store_failure_transition(transition), Some(err.into()))
                .await;
            return;
        }

        match self.establish(epoch, token, &claims, transition) {
            Settled::Established => {}
            Settled::Expired => {
                tracing::warn!(expiry = %claims.expiry, "issued token expires inside the refresh lead time");
                self.clear_session(
                    Transition::RefreshExpiredImmediate,
                    Some(SessionError::Expired),
                )
                .await;
            }
            Settled::Superseded => {
                tracing::debug!(%transition, "session superseded while persisting");
            }
        }
    }

    /// Schedules the refresh for `claims` and applies the authenticating
    /// transition, unless the session moved on.
    fn establish(
        self: &Arc<Self>,
        epoch: u64,
        token: Token,
        claims: &TokenClaims,
        transition: Transition,
    ) -> Settled {
        let mut session = self.session.lock();
        if session.epoch != epoch || !transition.allowed_from(session.state.phase) {
            return Settled::Superseded;
        }
        let outcome = self.scheduler.schedule_refresh(
            claims,
            self.config.refresh_lead_time(),
            refresh_task(Arc::downgrade(self), epoch),
        );
        match outcome {
            ScheduleOutcome::Scheduled { due_at } => {
                session.token = Some(token);
                self.apply(&mut session, transition, |state| {
                    *state = SessionState::authenticated(claims);
                });
                tracing::info!(user = %claims.user, roles = claims.roles.len(), refresh_at = %due_at, "session established");
                Settled::Established
            }
            ScheduleOutcome::AlreadyExpired => Settled::Expired,
        }
    }

    async fn refresh_for_epoch(self: &Arc<Self>, expected: Option<u64>) {
        let (epoch, token) = {
            let mut session = self.session.lock();
            if expected.is_some_and(|expected| expected != session.epoch) {
                tracing::debug!("ignoring refresh timer from a previous session");
                return;
            }
            let Some(token) = session.token.clone() else {
                tracing::debug!(phase = %session.state.phase, "no session to refresh");
                return;
            };
            if !self.apply(&mut session, Transition::RefreshDue, |state| {
                state.error = None;
            }) {
                return;
            }
            (session.epoch, token)
        };
        self.scheduler.cancel();

        tracing::debug!(token = %token.preview(), url = %self.config.refresh_url(), "refreshing session token");
        match self.backend.refresh(&token).await {
            Ok(response) => {
                self.complete(epoch, response.token, Transition::RefreshSuccess)
                    .await;
            }
            Err(err) => {
                self.fail(epoch, Transition::RefreshFailure, err.into())
                    .await;
            }
        }
    }

    async fn fail(&self, epoch: u64, transition: Transition, error: SessionError) {
        let _ops = self.ops.lock().await;
        if !self.is_current(epoch, transition) {
            tracing::debug!(%transition, error = %error, "discarding stale failure");
            return;
        }
        tracing::warn!(%transition, error = %error, "session request failed");
        self.clear_session(transition, Some(error)).await;
    }

    /// Tears the session down. Callers hold the operation lock.
    async fn clear_session(&self, transition: Transition, error: Option<SessionError>) {
        let epoch = {
            let mut session = self.session.lock();
            session.epoch += 1;
            session.token = None;
            session.epoch
        };
        self.scheduler.cancel();
        if let Err(err) = self.store.delete().await {
            tracing::warn!(error = %err, "failed to delete stored token");
        }

        let message = error.map(|err| err.to_string());
        let mut session = self.session.lock();
        if session.epoch != epoch {
            tracing::debug!(%transition, "sign-out superseded by a newer login");
            return;
        }
        if self.apply(&mut session, transition, |state| {
            *state = SessionState::signed_out();
            state.error = message;
        }) {
            tracing::info!(%transition, "signed out");
        }
    }
}
