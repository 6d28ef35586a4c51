use super::CredentialProvider;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

/// Static API key sent in a single header (default `X-API-Key`).
#[derive(Debug)]
pub struct ApiKeyAuth {
    api_key: SecretString,
    header_name: HeaderName,
}

impl ApiKeyAuth {
    pub const DEFAULT_HEADER: &'static str = "X-API-Key";

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_header(api_key, Self::DEFAULT_HEADER)
    }

    /// Uses a custom header name instead of `X-API-Key`.
    pub fn with_header(api_key: impl Into<String>, header_name: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(rejected("api_key", "API key cannot be empty"));
        }
        if HeaderValue::from_str(&api_key).is_err() {
            return Err(rejected("api_key", "API key is not a valid header value"));
        }
        let header_name = HeaderName::from_bytes(header_name.trim().as_bytes())
            .map_err(|_| rejected("header_name", "Invalid header name"))?;
        Ok(Self {
            api_key: SecretString::from(api_key),
            header_name,
        })
    }

    /// Wraps an already resolved key (see [`super::resolve_api_key`]).
    pub fn from_secret(api_key: SecretString) -> Result<Self> {
        Self::new(api_key.expose_secret().to_string())
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }
}

#[async_trait]
impl CredentialProvider for ApiKeyAuth {
    async fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            self.header_name.clone(),
            sensitive_value(self.api_key.expose_secret())?,
        );
        Ok(headers)
    }

    async fn refresh_if_needed(&self) -> Result<()> {
        Ok(())
    }
}

/// Static bearer token: `Authorization: Bearer <token>`.
#[derive(Debug)]
pub struct BearerTokenAuth {
    token: SecretString,
}

impl BearerTokenAuth {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(rejected("token", "Bearer token cannot be empty"));
        }
        if HeaderValue::from_str(&format!("Bearer {}", token)).is_err() {
            return Err(rejected("token", "Bearer token is not a valid header value"));
        }
        Ok(Self {
            token: SecretString::from(token),
        })
    }
}

#[async_trait]
impl CredentialProvider for BearerTokenAuth {
    async fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            sensitive_value(&format!("Bearer {}", self.token.expose_secret()))?,
        );
        Ok(headers)
    }

    async fn refresh_if_needed(&self) -> Result<()> {
        Ok(())
    }
}

/// Header value marked sensitive so it is redacted from `Debug` output.
pub(super) fn sensitive_value(raw: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(raw)
        .map_err(|e| Error::authentication("Credential is not a valid header value").with_cause(e))?;
    value.set_sensitive(true);
    Ok(value)
}

pub(super) fn rejected(field: &str, message: &str) -> Error {
    Error::validation_with_context(
        message,
        ErrorContext::new()
            .with_details(serde_json::json!([{ "field": field, "message": message }]))
            .with_source("auth"),
    )
}
