//! In-memory fakes for driving the session engine in tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use tessera_application::{
    AuthBackend, BackendError, Clock, LoginResponse, MfaChallenge, RefreshResponse, SessionEngine,
    SessionPorts, SessionStore, StoreError, StoreResult, Timer, TimerHandle, TimerTask,
    TokenCodec,
};
use tessera_domain::{
    Credentials, DecodeError, Endpoints, SessionConfig, Token, TokenClaims, UserIdentity,
};
use url::Url;

/// 2026-01-01T00:00:00Z
pub fn epoch_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn secs(n: i64) -> TimeDelta {
    TimeDelta::seconds(n)
}

pub fn test_config() -> SessionConfig {
    SessionConfig::new(
        "https://auth.example.com",
        Endpoints::new("/api/auth/login", "/api/auth/refresh", "/api/auth/oauth"),
    )
    .unwrap()
}

// --- Clock ---

#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// --- Timer ---

struct ScheduledTask {
    delay: Duration,
    task: Option<TimerTask>,
    cancelled: Arc<AtomicBool>,
}

/// Timer whose tasks only run when a test fires them.
#[derive(Default)]
pub struct ManualTimer {
    tasks: Mutex<Vec<ScheduledTask>>,
    cancellations: Arc<AtomicUsize>,
}

impl ManualTimer {
    /// Delays of tasks that are neither fired nor cancelled.
    pub fn pending(&self) -> Vec<Duration> {
        self.tasks
            .lock()
            .iter()
            .filter(|t| t.task.is_some() && !t.cancelled.load(Ordering::SeqCst))
            .map(|t| t.delay)
            .collect()
    }

    pub fn cancellations(&self) -> usize {
        self.cancellations.load(Ordering::SeqCst)
    }

    pub fn scheduled_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Runs the oldest live task. Returns false if none was pending.
    pub async fn fire_next(&self) -> bool {
        let task = {
            let mut tasks = self.tasks.lock();
            tasks
                .iter_mut()
                .find(|t| t.task.is_some() && !t.cancelled.load(Ordering::SeqCst))
                .and_then(|t| t.task.take())
        };
        match task {
            Some(task) => {
                task.await;
                true
            }
            None => false,
        }
    }

    /// Takes the most recently scheduled task, even if it was cancelled.
    pub fn take_last(&self) -> Option<TimerTask> {
        self.tasks.lock().iter_mut().rev().find_map(|t| t.task.take())
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks.lock().push(ScheduledTask {
            delay,
            task: Some(task),
            cancelled: Arc::clone(&cancelled),
        });
        let cancellations = Arc::clone(&self.cancellations);
        TimerHandle::new(move || {
            if !cancelled.swap(true, Ordering::SeqCst) {
                cancellations.fetch_add(1, Ordering::SeqCst);
            }
        })
    }
}

// --- Backend ---

/// Backend that replays queued responses.
#[derive(Default)]
pub struct ScriptedBackend {
    logins: Mutex<VecDeque<Result<LoginResponse, BackendError>>>,
    refreshes: Mutex<VecDeque<Result<RefreshResponse, BackendError>>>,
    login_credentials: Mutex<Vec<Credentials>>,
    refresh_bearers: Mutex<Vec<Token>>,
    hold: AtomicBool,
    release: Notify,
}

impl ScriptedBackend {
    pub fn push_login(&self, response: Result<LoginResponse, BackendError>) {
        self.logins.lock().push_back(response);
    }

    pub fn push_login_token(&self, token: &str) {
        self.push_login(Ok(LoginResponse::with_token(Token::from(token))));
    }

    pub fn push_refresh(&self, response: Result<RefreshResponse, BackendError>) {
        self.refreshes.lock().push_back(response);
    }

    pub fn push_refresh_token(&self, token: &str) {
        self.push_refresh(Ok(RefreshResponse {
            token: Token::from(token),
        }));
    }

    /// Makes login calls wait for [`Self::release`].
    pub fn hold_logins(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn login_calls(&self) -> usize {
        self.login_credentials.lock().len()
    }

    pub fn refresh_bearers(&self) -> Vec<Token> {
        self.refresh_bearers.lock().clone()
    }
}

pub fn unauthorized(operation: &'static str) -> BackendError {
    BackendError::Status {
        operation,
        status: 401,
        detail: "unauthorized".into(),
    }
}

#[async_trait]
impl AuthBackend for ScriptedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        self.login_credentials.lock().push(credentials.clone());
        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.logins
            .lock()
            .pop_front()
            .expect("unexpected login call")
    }

    async fn refresh(&self, token: &Token) -> Result<RefreshResponse, BackendError> {
        self.refresh_bearers.lock().push(token.clone());
        self.refreshes
            .lock()
            .pop_front()
            .expect("unexpected refresh call")
    }
}

// --- Codec ---

/// Codec that looks tokens up in a table.
#[derive(Default)]
pub struct MapCodec {
    claims: Mutex<HashMap<String, TokenClaims>>,
}

impl MapCodec {
    pub fn insert(&self, token: &str, claims: TokenClaims) {
        self.claims.lock().insert(token.to_string(), claims);
    }
}

impl TokenCodec for MapCodec {
    fn decode(&self, token: &Token) -> Result<TokenClaims, DecodeError> {
        self.claims
            .lock()
            .get(token.as_str())
            .cloned()
            .ok_or(DecodeError::Malformed(1))
    }
}

// --- Store ---

#[derive(Default)]
pub struct FakeStore {
    entry: Mutex<Option<(Token, u32)>>,
    fail_writes: AtomicBool,
    deletes: AtomicUsize,
    reads: AtomicUsize,
    hold_reads: AtomicBool,
    release_reads: Notify,
}

impl FakeStore {
    pub fn seed(&self, token: &str) {
        *self.entry.lock() = Some((Token::from(token), 7));
    }

    pub fn entry(&self) -> Option<(Token, u32)> {
        self.entry.lock().clone()
    }

    pub fn stored_token(&self) -> Option<String> {
        self.entry().map(|(token, _)| token.as_str().to_string())
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Makes `get` wait for [`Self::release_reads`].
    pub fn hold_reads(&self) {
        self.hold_reads.store(true, Ordering::SeqCst);
    }

    pub fn release_reads(&self) {
        self.release_reads.notify_one();
    }
}

#[async_trait]
impl SessionStore for FakeStore {
    async fn get(&self) -> StoreResult<Option<Token>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.hold_reads.load(Ordering::SeqCst) {
            self.release_reads.notified().await;
        }
        Ok(self.entry.lock().as_ref().map(|(token, _)| token.clone()))
    }

    async fn set(&self, token: &Token, ttl_days: u32) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        *self.entry.lock() = Some((token.clone(), ttl_days));
        Ok(())
    }

    async fn delete(&self) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        *self.entry.lock() = None;
        Ok(())
    }
}

// --- Harness ---

pub struct Harness {
    pub engine: SessionEngine,
    pub clock: Arc<ManualClock>,
    pub timer: Arc<ManualTimer>,
    pub backend: Arc<ScriptedBackend>,
    pub codec: Arc<MapCodec>,
    pub store: Arc<FakeStore>,
    pub navigations: Arc<Mutex<Vec<Url>>>,
    pub challenges: Arc<Mutex<Vec<MfaChallenge>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let clock = Arc::new(ManualClock::at(epoch_now()));
        let timer = Arc::new(ManualTimer::default());
        let backend = Arc::new(ScriptedBackend::default());
        let codec = Arc::new(MapCodec::default());
        let store = Arc::new(FakeStore::default());
        let navigations = Arc::new(Mutex::new(Vec::new()));
        let challenges = Arc::new(Mutex::new(Vec::new()));

        let seen_urls = Arc::clone(&navigations);
        let seen_challenges = Arc::clone(&challenges);
        let ports = SessionPorts::new(
            backend.clone(),
            store.clone(),
            codec.clone(),
            clock.clone(),
            timer.clone(),
        )
        .with_navigator(move |url: &Url| seen_urls.lock().push(url.clone()))
        .with_mfa_hook(move |challenge: &MfaChallenge| {
            seen_challenges.lock().push(challenge.clone());
        });

        Self {
            engine: SessionEngine::new(config, ports),
            clock,
            timer,
            backend,
            codec,
            store,
            navigations,
            challenges,
        }
    }

    /// Registers `token` with the codec, expiring `ttl_secs` from now.
    pub fn issue(&self, token: &str, user: &str, roles: &[&str], ttl_secs: i64) {
        let claims = TokenClaims::new(
            UserIdentity::from(user),
            roles.iter().copied(),
            self.clock.now() + secs(ttl_secs),
        );
        self.codec.insert(token, claims);
    }

    /// Logs in as `alice` with token `token`.
    pub async fn login_with(&self, token: &str) {
        self.backend.push_login_token(token);
        self.engine.login(alice()).await;
    }
}

pub fn alice() -> Credentials {
    Credentials::username_password("alice", "correct horse")
}
