//! Tessera - Main Entry Point
//!
//! Wires the HTTP backend, JWT codec, file store and tokio timer into a
//! session engine and drives it from the command line.

mod cli;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tessera_application::{MfaChallenge, SessionEngine, SessionPorts};
use tessera_domain::{Credentials, SessionConfig, SessionPhase, SessionState, Token};
use tessera_infrastructure::{
    FileSessionStore, JwtTokenCodec, ReqwestAuthBackend, SystemClock, TokioTimer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use crate::cli::{Cli, Command};

type AppResult<T> = Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> AppResult<ExitCode> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = SessionConfig::from_env()?;
    let state_dir = resolve_state_dir(cli.state_dir)?;
    tracing::debug!(state_dir = %state_dir.display(), "using session directory");
    let engine = build_engine(config, state_dir)?;

    match cli.command {
        Command::Status => {
            engine.initialize().await;
            print_state(&engine.state())
        }
        Command::Login { username, password } => {
            login(&engine, Credentials::username_password(username, password)).await
        }
        Command::Logout => {
            engine.initialize().await;
            engine.logout().await;
            print_state(&engine.state())
        }
        Command::Oauth { provider } => {
            engine.start_oauth_flow(&provider);
            Ok(ExitCode::SUCCESS)
        }
        Command::Watch => watch(&engine).await,
    }
}

fn resolve_state_dir(explicit: Option<PathBuf>) -> AppResult<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("tessera"))
        .ok_or_else(|| "no data directory found, set TESSERA_STATE_DIR".into())
}

fn build_engine(config: SessionConfig, state_dir: PathBuf) -> AppResult<SessionEngine> {
    let backend = ReqwestAuthBackend::new(&config)?;
    let store = FileSessionStore::new(state_dir, config.credential_name());
    let ports = SessionPorts::new(
        Arc::new(backend),
        Arc::new(store),
        Arc::new(JwtTokenCodec::new()),
        Arc::new(SystemClock::new()),
        Arc::new(TokioTimer::new()),
    )
    .with_navigator(|url: &Url| println!("{url}"))
    .with_mfa_hook(|_: &MfaChallenge| {
        eprintln!("Second factor required. Paste the token issued by your MFA flow:");
    });
    Ok(SessionEngine::new(config, ports))
}

async fn login(engine: &SessionEngine, credentials: Credentials) -> AppResult<ExitCode> {
    engine.initialize().await;
    engine.login(credentials).await;

    if engine.state().phase == SessionPhase::AwaitingMfa {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => {
                engine.complete_mfa(Token::new(line.trim())).await;
            }
            _ => {
                engine.logout().await;
                return Err("no MFA token supplied".into());
            }
        }
    }
    print_state(&engine.state())
}

async fn watch(engine: &SessionEngine) -> AppResult<ExitCode> {
    let mut events = engine.subscribe();
    engine.initialize().await;
    if !engine.state().is_authenticated {
        tracing::warn!("no active session, log in first");
        return print_state(&engine.state());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(state) => {
                    tracing::info!(
                        phase = %state.phase,
                        user = ?state.user.as_ref().map(ToString::to_string),
                        error = ?state.error,
                        "session state changed"
                    );
                    if !state.is_authenticated && !state.phase.is_in_flight() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "state observer lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    print_state(&engine.state())
}

fn print_state(state: &SessionState) -> AppResult<ExitCode> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(if state.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
