//! Session configuration
//!
//! Required fields are validated when the configuration is built, so a
//! running engine never discovers a missing endpoint at call time.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Default retention of the persisted credential.
pub const DEFAULT_TOKEN_TTL_DAYS: u32 = 7;

/// Default interval before expiry at which the refresh fires.
pub const DEFAULT_REFRESH_LEAD_TIME: Duration = Duration::from_secs(60);

/// Default name of the persisted credential entry.
pub const DEFAULT_CREDENTIAL_NAME: &str = "authToken";

/// Backend endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    /// Login endpoint, e.g. `/auth/login`.
    pub login: String,
    /// Refresh endpoint, e.g. `/auth/refresh`.
    pub refresh_token: String,
    /// OAuth redirect prefix, e.g. `/auth/oauth`.
    pub oauth: String,
}

impl Endpoints {
    /// Creates the endpoint set.
    #[must_use]
    pub fn new(
        login: impl Into<String>,
        refresh_token: impl Into<String>,
        oauth: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            refresh_token: refresh_token.into(),
            oauth: oauth.into(),
        }
    }
}

/// Validated session configuration.
///
/// Build with [`SessionConfig::new`] and override optional values with the
/// `with_*` methods, or use [`SessionConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionConfig", into = "RawSessionConfig")]
pub struct SessionConfig {
    base_url: String,
    endpoints: Endpoints,
    login_url: Url,
    refresh_url: Url,
    oauth_url: Url,
    token_ttl_days: u32,
    refresh_lead_time: Duration,
    credential_name: String,
}

impl SessionConfig {
    /// Validates the base URL and endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the base URL is empty, unparsable or not
    /// http(s), or if any endpoint path is empty.
    pub fn new(base_url: impl Into<String>, endpoints: Endpoints) -> ConfigResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let parsed = Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url,
                reason: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let login_url = join_endpoint(&base_url, "login", &endpoints.login)?;
        let refresh_url = join_endpoint(&base_url, "refreshToken", &endpoints.refresh_token)?;
        let oauth_url = join_endpoint(&base_url, "oauth", &endpoints.oauth)?;

        Ok(Self {
            base_url,
            endpoints,
            login_url,
            refresh_url,
            oauth_url,
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            refresh_lead_time: DEFAULT_REFRESH_LEAD_TIME,
            credential_name: DEFAULT_CREDENTIAL_NAME.to_string(),
        })
    }

    /// Builds the configuration from environment variables.
    ///
    /// # Required env vars
    /// - `TESSERA_BASE_URL`
    /// - `TESSERA_LOGIN_PATH`
    /// - `TESSERA_REFRESH_PATH`
    /// - `TESSERA_OAUTH_PATH`
    ///
    /// # Optional env vars
    /// - `TESSERA_TOKEN_TTL_DAYS`: credential retention (default 7)
    /// - `TESSERA_REFRESH_LEAD_SECS`: refresh lead time (default 60)
    /// - `TESSERA_CREDENTIAL_NAME`: persisted entry name (default `authToken`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVar(key));

        let endpoints = Endpoints::new(
            required("TESSERA_LOGIN_PATH")?,
            required("TESSERA_REFRESH_PATH")?,
            required("TESSERA_OAUTH_PATH")?,
        );
        let mut config = Self::new(required("TESSERA_BASE_URL")?, endpoints)?;

        if let Some(days) = lookup("TESSERA_TOKEN_TTL_DAYS") {
            let days = days.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: "TESSERA_TOKEN_TTL_DAYS",
                reason: format!("{e}"),
            })?;
            config = config.with_token_ttl_days(days)?;
        }
        if let Some(secs) = lookup("TESSERA_REFRESH_LEAD_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: "TESSERA_REFRESH_LEAD_SECS",
                reason: format!("{e}"),
            })?;
            config = config.with_refresh_lead_time(Duration::from_secs(secs));
        }
        if let Some(name) = lookup("TESSERA_CREDENTIAL_NAME") {
            config = config.with_credential_name(name)?;
        }

        Ok(config)
    }

    /// Overrides the credential retention period.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero retention.
    pub fn with_token_ttl_days(mut self, days: u32) -> ConfigResult<Self> {
        if days == 0 {
            return Err(ConfigError::InvalidValue {
                name: "token_ttl_days",
                reason: "must be at least 1".into(),
            });
        }
        self.token_ttl_days = days;
        Ok(self)
    }

    /// Overrides the refresh lead time.
    #[must_use]
    pub fn with_refresh_lead_time(mut self, lead: Duration) -> Self {
        self.refresh_lead_time = lead;
        self
    }

    /// Overrides the persisted credential entry name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for names that are empty or
    /// contain path separators.
    pub fn with_credential_name(mut self, name: impl Into<String>) -> ConfigResult<Self> {
        let name = name.into();
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidValue {
                name: "credential_name",
                reason: format!("`{name}` is not a usable entry name"),
            });
        }
        self.credential_name = name;
        Ok(self)
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Endpoint paths as configured.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Full login URL.
    #[must_use]
    pub const fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Full refresh URL.
    #[must_use]
    pub const fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }

    /// OAuth redirect URL for `provider`: `<base><oauth>/<provider>`.
    ///
    /// The provider is percent-encoded as a single path segment, so
    /// `azure/tenant` becomes `.../azure%2Ftenant` rather than two segments.
    #[must_use]
    pub fn oauth_url(&self, provider: &str) -> Url {
        let mut url = self.oauth_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(provider);
        }
        url
    }

    /// Credential retention in days.
    #[must_use]
    pub const fn token_ttl_days(&self) -> u32 {
        self.token_ttl_days
    }

    /// Interval before expiry at which the refresh fires.
    #[must_use]
    pub const fn refresh_lead_time(&self) -> Duration {
        self.refresh_lead_time
    }

    /// Name of the persisted credential entry.
    #[must_use]
    pub fn credential_name(&self) -> &str {
        &self.credential_name
    }
}

fn join_endpoint(base: &str, name: &'static str, path: &str) -> ConfigResult<Url> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ConfigError::MissingEndpoint(name));
    }
    let joined = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    Url::parse(&joined).map_err(|e| ConfigError::InvalidEndpoint {
        name,
        reason: e.to_string(),
    })
}

/// Wire form of [`SessionConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSessionConfig {
    #[serde(rename = "baseURL", alias = "baseUrl")]
    base_url: String,
    endpoints: Endpoints,
    #[serde(default = "default_ttl_days")]
    token_ttl_days: u32,
    #[serde(default = "default_lead_secs")]
    refresh_lead_secs: u64,
    #[serde(default = "default_credential_name")]
    credential_name: String,
}

const fn default_ttl_days() -> u32 {
    DEFAULT_TOKEN_TTL_DAYS
}

const fn default_lead_secs() -> u64 {
    DEFAULT_REFRESH_LEAD_TIME.as_secs()
}

fn default_credential_name() -> String {
    DEFAULT_CREDENTIAL_NAME.to_string()
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        Self::new(raw.base_url, raw.endpoints)?
            .with_token_ttl_days(raw.token_ttl_days)?
            .with_credential_name(raw.credential_name)
            .map(|c| c.with_refresh_lead_time(Duration::from_secs(raw.refresh_lead_secs)))
    }
}

impl From<SessionConfig> for RawSessionConfig {
    fn from(config: SessionConfig) -> Self {
        Self {
            base_url: config.base_url,
            endpoints: config.endpoints,
            token_ttl_days: config.token_ttl_days,
            refresh_lead_secs: config.refresh_lead_time.as_secs(),
            credential_name: config.credential_name,
        }
    }
}
