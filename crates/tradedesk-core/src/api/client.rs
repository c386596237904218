//! API client for the tradedesk auth server.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::User;

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server calls the auth layer depends on.
pub trait AuthApi: Send + Sync {
    /// Invalidate the server-side session for `token`.
    fn logout<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), ApiError>>;

    /// Exchange email and password for a session.
    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<LoginResponse, ApiError>>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    /// Session lifetime in seconds, when the server dictates one.
    #[serde(rename = "expiresIn", default)]
    pub expires_in: Option<i64>,
}

/// Auth server client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the server at `base_url`.
    ///
    /// The cookie store keeps any server session cookie so logout is sent
    /// with credentials included.
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;
        // Endpoints are joined relative to the base, which needs a trailing
        // slash to keep any path prefix.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidResponse(format!("Bad endpoint {}: {}", path, e)))
    }

    /// URL the login popup opens for a named identity provider,
    /// e.g. `google` or `github`.
    pub fn provider_url(&self, provider: &str) -> Result<Url, ApiError> {
        self.endpoint(&format!("auth/{}", urlencoding::encode(provider)))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub async fn logout_session(&self, token: &str) -> Result<(), ApiError> {
        let url = self.endpoint("auth/logout")?;
        debug!(%url, "Sending logout request");

        let response = self.client.post(url).bearer_auth(token).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }

    pub async fn login_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint("auth/login")?;
        debug!(%url, email, "Sending credential login request");

        let response = self
            .client
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        response.json::<LoginResponse>().await.map_err(|e| {
            warn!(error = %e, "Failed to parse login response");
            ApiError::InvalidResponse(format!("Failed to parse login response: {}", e))
        })
    }
}

impl AuthApi for ApiClient {
    fn logout<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<(), ApiError>> {
        Box::pin(self.logout_session(token))
    }

    fn login<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<LoginResponse, ApiError>> {
        Box::pin(self.login_with_credentials(email, password))
    }
}
