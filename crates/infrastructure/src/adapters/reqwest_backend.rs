//! Identity backend adapter using reqwest.
//!
//! Implements the `AuthBackend` port over HTTP: a JSON login request and a
//! bearer-authenticated refresh request, both `POST`.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tessera_application::ports::{AuthBackend, LoginResponse, RefreshResponse};
use tessera_application::BackendError;
use tessera_domain::{Credentials, SessionConfig, Token};

/// Content-Type for JSON requests.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Longest response body kept in error details.
const MAX_DETAIL_LEN: usize = 512;

/// HTTP client for the login and refresh endpoints.
#[derive(Debug, Clone)]
pub struct ReqwestAuthBackend {
    client: Client,
    login_url: Url,
    refresh_url: Url,
}

impl ReqwestAuthBackend {
    /// Creates a backend for the endpoints in `config`.
    ///
    /// Redirects are not followed. No request timeout is set; use
    /// [`Self::with_client`] to supply a configured client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &SessionConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(concat!("tessera/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BackendError::Network {
                operation: "client",
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a backend around an existing reqwest client.
    #[must_use]
    pub fn with_client(client: Client, config: &SessionConfig) -> Self {
        Self {
            client,
            login_url: config.login_url().clone(),
            refresh_url: config.refresh_url().clone(),
        }
    }

    async fn send(
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| BackendError::Network {
            operation,
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut detail = response.text().await.unwrap_or_default();
            if detail.len() > MAX_DETAIL_LEN {
                let cut = (0..=MAX_DETAIL_LEN)
                    .rev()
                    .find(|&i| detail.is_char_boundary(i))
                    .unwrap_or(0);
                detail.truncate(cut);
            }
            tracing::warn!(operation, status = status.as_u16(), "backend rejected request");
            return Err(BackendError::Status {
                operation,
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T, BackendError> {
        let body = response.bytes().await.map_err(|e| BackendError::Network {
            operation,
            message: e.to_string(),
        })?;
        serde_json::from_slice(&body).map_err(|e| BackendError::InvalidResponse {
            operation,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl AuthBackend for ReqwestAuthBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        tracing::debug!(url = %self.login_url, "POST login");
        let request = self.client.post(self.login_url.clone()).json(credentials);
        let response = Self::send("login", request).await?;
        Self::parse("login", response).await
    }

    async fn refresh(&self, token: &Token) -> Result<RefreshResponse, BackendError> {
        tracing::debug!(url = %self.refresh_url, token = %token.preview(), "POST refresh");
        let request = self
            .client
            .post(self.refresh_url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .bearer_auth(token.as_str());
        let response = Self::send("refresh", request).await?;
        Self::parse("refresh", response).await
    }
}
