//! Integration tests for the HTTP backend and a fully wired engine
//!
//! A local axum server stands in for the identity backend.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::tempdir;

use tessera_application::{AuthBackend, BackendError, SessionEngine, SessionPorts};
use tessera_domain::{Credentials, Endpoints, SessionConfig, SessionPhase, Token, UserIdentity};
use tessera_infrastructure::{
    FileSessionStore, JwtTokenCodec, ReqwestAuthBackend, SystemClock, TokioTimer,
};

fn jwt(user: &str, roles: &[&str], ttl_secs: i64) -> String {
    let exp = (Utc::now() + TimeDelta::seconds(ttl_secs)).timestamp();
    let payload = json!({"user": user, "roles": roles, "exp": exp});
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.c2ln",
        URL_SAFE_NO_PAD.encode(payload.to_string())
    )
}

/// Issued by the fake backend for `alice`.
fn alice_token() -> String {
    jwt("alice", &["admin"], 3600)
}

async fn login(Json(body): Json<Value>) -> Response {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some("alice"), Some("secret")) => Json(json!({"token": alice_token()})).into_response(),
        (Some("mallory"), Some("secret")) => Json(json!({"requiresMFA": true})).into_response(),
        (Some("broken"), _) => (StatusCode::OK, "<html>oops</html>").into_response(),
        _ => (StatusCode::UNAUTHORIZED, "bad credentials").into_response(),
    }
}

async fn refresh(headers: HeaderMap) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some("application/json") {
        return (StatusCode::BAD_REQUEST, "expected json").into_response();
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(token) if token.starts_with("eyJ") => {
            Json(json!({"token": jwt("alice", &["admin", "auditor"], 7200)})).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, "token expired").into_response(),
    }
}

async fn spawn_backend() -> SocketAddr {
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

fn config_for(addr: SocketAddr) -> SessionConfig {
    SessionConfig::new(
        format!("http://{addr}"),
        Endpoints::new("/api/auth/login", "/api/auth/refresh", "/api/auth/oauth"),
    )
    .unwrap()
}

fn credentials(username: &str) -> Credentials {
    Credentials::username_password(username, "secret")
}

// --- ReqwestAuthBackend ---

#[tokio::test]
async fn test_login_returns_token() {
    let addr = spawn_backend().await;
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let response = backend.login(&credentials("alice")).await.unwrap();

    assert!(!response.requires_mfa);
    assert!(response.token.unwrap().as_str().starts_with("eyJ"));
}

#[tokio::test]
async fn test_login_reports_mfa() {
    let addr = spawn_backend().await;
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let response = backend.login(&credentials("mallory")).await.unwrap();

    assert!(response.requires_mfa);
    assert_eq!(response.token, None);
}

#[tokio::test]
async fn test_login_rejection_is_status_error() {
    let addr = spawn_backend().await;
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let err = backend
        .login(&Credentials::username_password("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BackendError::Status {
            operation: "login",
            status: 401,
            detail: "bad credentials".into(),
        }
    );
}

#[tokio::test]
async fn test_unparsable_body_is_invalid_response() {
    let addr = spawn_backend().await;
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let err = backend.login(&credentials("broken")).await.unwrap_err();

    assert!(matches!(
        err,
        BackendError::InvalidResponse {
            operation: "login",
            ..
        }
    ));
}

#[tokio::test]
async fn test_refresh_sends_bearer_token() {
    let addr = spawn_backend().await;
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let response = backend.refresh(&Token::new(alice_token())).await.unwrap();
    assert!(response.token.as_str().starts_with("eyJ"));

    let err = backend.refresh(&Token::from("revoked")).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "refresh failed with HTTP 401");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let backend = ReqwestAuthBackend::new(&config_for(addr)).unwrap();

    let err = backend.login(&credentials("alice")).await.unwrap_err();

    assert!(matches!(
        err,
        BackendError::Network {
            operation: "login",
            ..
        }
    ));
}

// --- Wired engine ---

fn engine(config: SessionConfig, dir: &std::path::Path) -> SessionEngine {
    let backend = ReqwestAuthBackend::new(&config).unwrap();
    let store = FileSessionStore::new(dir, config.credential_name());
    let ports = SessionPorts::new(
        Arc::new(backend),
        Arc::new(store),
        Arc::new(JwtTokenCodec::new()),
        Arc::new(SystemClock::new()),
        Arc::new(TokioTimer::new()),
    );
    SessionEngine::new(config, ports)
}

#[tokio::test]
async fn test_session_survives_restart_and_refreshes() {
    let addr = spawn_backend().await;
    let dir = tempdir().unwrap();
    let session_file = dir.path().join("authToken.json");

    let first = engine(config_for(addr), dir.path());
    first.initialize().await;
    first.login(credentials("alice")).await;

    let state = first.state();
    assert!(state.is_authenticated, "{state:?}");
    assert_eq!(state.user, Some(UserIdentity::from("alice")));
    assert!(session_file.exists());
    let due = first.pending_refresh_at().unwrap();
    let expected = Utc::now() + TimeDelta::seconds(3540);
    assert!((expected - due).num_seconds().abs() <= 5, "due at {due}");
    drop(first);

    let second = engine(config_for(addr), dir.path());
    second.initialize().await;
    assert!(second.state().is_authenticated);
    assert!(!second.check_permission("auditor"));

    second.refresh().await;
    assert_eq!(second.state().phase, SessionPhase::Authenticated);
    assert!(second.check_permission("auditor"));

    second.logout().await;
    assert!(!second.state().is_authenticated);
    assert!(!session_file.exists());
}

#[tokio::test]
async fn test_failed_login_leaves_no_file() {
    let addr = spawn_backend().await;
    let dir = tempdir().unwrap();
    let engine = engine(config_for(addr), dir.path());
    engine.initialize().await;

    engine
        .login(Credentials::username_password("alice", "wrong"))
        .await;

    let state = engine.state();
    assert_eq!(state.error.as_deref(), Some("login failed with HTTP 401"));
    assert!(!dir.path().join("authToken.json").exists());
}
