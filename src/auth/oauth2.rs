//! OAuth2 client-credentials provider with token refresh.

use super::static_key::{rejected, sensitive_value};
use super::CredentialProvider;
use crate::{Error, ErrorContext, ErrorKind, Result};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// A token counts as expired this long before its nominal expiry.
pub const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(60);

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable OAuth2 token state. Replaced as a whole on every refresh.
pub struct OAuth2Token {
    access_token: SecretString,
    token_type: String,
    issued_at: SystemTime,
    expires_in: Option<Duration>,
    refresh_token: Option<SecretString>,
    scope: Option<String>,
}

impl OAuth2Token {
    /// A token issued now. `expires_in = None` never expires.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        expires_in: Option<Duration>,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            token_type: token_type.into(),
            issued_at: SystemTime::now(),
            expires_in,
            refresh_token: None,
            scope: None,
        }
    }

    pub fn with_issued_at(mut self, issued_at: SystemTime) -> Self {
        self.issued_at = issued_at;
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(SecretString::from(refresh_token.into()));
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn issued_at(&self) -> SystemTime {
        self.issued_at
    }

    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in
    }

    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Nominal expiry instant, if the token has a lifetime.
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_in.map(|lifetime| self.issued_at + lifetime)
    }

    /// Whether the token is expired at `now`, counting [`TOKEN_EXPIRY_SKEW`].
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match self.expires_at() {
            Some(expires_at) => now + TOKEN_EXPIRY_SKEW >= expires_at,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose_secret())
    }
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth2 client-credentials flow.
///
/// The first call to [`headers`](CredentialProvider::headers) exchanges the
/// client credentials for a token; later calls reuse it until it expires,
/// then refresh with the refresh token when one was issued. Concurrent
/// callers that find the token expired wait for a single refresh.
pub struct OAuth2Auth {
    client_id: String,
    client_secret: SecretString,
    token_url: Url,
    scope: Option<String>,
    token: ArcSwapOption<OAuth2Token>,
    refresh_gate: Mutex<()>,
    http: reqwest::Client,
}

impl OAuth2Auth {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: &str,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() {
            return Err(rejected("client_id", "Client ID cannot be empty"));
        }
        if client_secret.trim().is_empty() {
            return Err(rejected("client_secret", "Client secret cannot be empty"));
        }
        let token_url = Url::parse(token_url.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .ok_or_else(|| rejected("token_url", "Token URL must be an absolute http(s) URL"))?;

        // Shared by the async and blocking executors, which run on different
        // runtimes, so pooled connections must not outlive a request.
        let http = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| Error::unknown("Failed to build OAuth2 HTTP client").with_cause(e))?;

        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            token_url,
            scope: None,
            token: ArcSwapOption::empty(),
            refresh_gate: Mutex::new(()),
            http,
        })
    }

    /// Space-separated scopes requested from the token endpoint.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Seeds the provider with an existing token.
    pub fn with_token(self, token: OAuth2Token) -> Self {
        self.token.store(Some(Arc::new(token)));
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Snapshot of the current token, if any.
    pub fn current_token(&self) -> Option<Arc<OAuth2Token>> {
        self.token.load_full()
    }

    fn valid_token(&self) -> Option<Arc<OAuth2Token>> {
        self.token.load_full().filter(|t| !t.is_expired())
    }

    fn form(&self, previous: Option<&OAuth2Token>) -> Vec<(&'static str, String)> {
        let mut form = Vec::with_capacity(5);
        match previous.and_then(OAuth2Token::refresh_token) {
            Some(refresh) => {
                form.push(("grant_type", "refresh_token".to_string()));
                form.push(("refresh_token", refresh.expose_secret().to_string()));
            }
            None => form.push(("grant_type", "client_credentials".to_string())),
        }
        form.push(("client_id", self.client_id.clone()));
        form.push((
            "client_secret",
            self.client_secret.expose_secret().to_string(),
        ));
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.clone()));
        }
        form
    }

    async fn request_token(&self, previous: Option<&OAuth2Token>) -> Result<OAuth2Token> {
        let form = self.form(previous);
        debug!(
            token_url = self.token_url.as_str(),
            grant_type = form[0].1.as_str(),
            "requesting OAuth2 token"
        );

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OAuth2 token request failed");
                token_failure(format!("Token request failed: {}", e), ErrorContext::new())
                    .with_cause(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            token_failure(format!("Token request failed: {}", e), ErrorContext::new()).with_cause(e)
        })?;

        if !status.is_success() {
            let description = error_description(&body)
                .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));
            warn!(
                http_status = status.as_u16(),
                description = description.as_str(),
                "OAuth2 token endpoint rejected the request"
            );
            return Err(token_failure(
                format!("Token refresh failed: {}", description),
                ErrorContext::new().with_status_code(status.as_u16()),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| token_failure("Invalid token response", ErrorContext::new()).with_cause(e))?;

        let mut token = OAuth2Token::new(
            parsed.access_token,
            parsed.token_type,
            parsed.expires_in.map(Duration::from_secs),
        );
        token.scope = parsed.scope;
        token.refresh_token = match parsed.refresh_token {
            Some(fresh) => Some(SecretString::from(fresh)),
            None => previous
                .and_then(OAuth2Token::refresh_token)
                .map(|prev| SecretString::from(prev.expose_secret().to_string())),
        };
        debug!(expires_in = ?token.expires_in, "OAuth2 token acquired");
        Ok(token)
    }
}

fn token_failure(message: impl Into<String>, context: ErrorContext) -> Error {
    Error::from_kind(ErrorKind::Authentication, message, context.with_source("oauth2"))
}

/// Readable reason from a token endpoint error body.
fn error_description(body: &str) -> Option<String> {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["error_description", "error"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
    });
    from_json.or_else(|| {
        let text = body.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

#[async_trait]
impl CredentialProvider for OAuth2Auth {
    async fn headers(&self) -> Result<HeaderMap> {
        self.refresh_if_needed().await?;
        let token = self
            .token
            .load_full()
            .ok_or_else(|| Error::authentication("No valid OAuth2 token available"))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, sensitive_value(&token.authorization_value())?);
        Ok(headers)
    }

    async fn refresh_if_needed(&self) -> Result<()> {
        if self.valid_token().is_some() {
            return Ok(());
        }

        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited.
        if self.valid_token().is_some() {
            return Ok(());
        }

        let previous = self.token.load_full();
        let fresh = self.request_token(previous.as_deref()).await?;
        self.token.store(Some(Arc::new(fresh)));
        Ok(())
    }
}

impl fmt::Debug for OAuth2Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Auth")
            .field("client_id", &self.client_id)
            .field("token_url", &self.token_url.as_str())
            .field("scope", &self.scope)
            .field("token", &self.token.load_full())
            .finish_non_exhaustive()
    }
}
