//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Client-side authentication session manager.
///
/// The identity backend is configured through `TESSERA_BASE_URL`,
/// `TESSERA_LOGIN_PATH`, `TESSERA_REFRESH_PATH` and `TESSERA_OAUTH_PATH`.
#[derive(Debug, Parser)]
#[command(name = "tessera", version)]
pub struct Cli {
    /// Directory holding the session file [default: <data dir>/tessera]
    #[arg(long, global = true, env = "TESSERA_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Restore the stored session and print its state as JSON
    Status,
    /// Log in with a username and password
    Login {
        /// Account name
        username: String,
        /// Account password
        #[arg(long, env = "TESSERA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and delete the stored session
    Logout,
    /// Print the OAuth login URL for a provider
    Oauth {
        /// Provider name, e.g. `google`
        provider: String,
    },
    /// Keep the session alive, logging every state change until Ctrl-C
    Watch,
}
