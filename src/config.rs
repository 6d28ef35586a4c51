//! Client configuration.
//!
//! [`ClientConfig`] is immutable once built and is shared through an `Arc` by
//! every façade and by both executor modes.

use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.dataapi.com/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("dataapi-rust/{}", env!("CARGO_PKG_VERSION"))
}

/// Validated, read-only client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    user_agent: String,
    verify_ssl: bool,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Builds a configuration from `DATAAPI_*` environment variables, falling
    /// back to defaults for unset ones.
    ///
    /// - `DATAAPI_BASE_URL`
    /// - `DATAAPI_TIMEOUT_SECS` (fractional seconds allowed)
    /// - `DATAAPI_MAX_RETRIES`
    /// - `DATAAPI_RETRY_DELAY_SECS` (fractional seconds allowed)
    /// - `DATAAPI_USER_AGENT`
    /// - `DATAAPI_VERIFY_SSL` (`true`/`false`/`1`/`0`)
    pub fn from_env() -> Result<Self> {
        let mut builder = ClientConfigBuilder::new();
        if let Ok(url) = env::var("DATAAPI_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(secs) = env_parse::<f64>("DATAAPI_TIMEOUT_SECS")? {
            builder = builder.timeout_secs(secs);
        }
        if let Some(n) = env_parse::<u32>("DATAAPI_MAX_RETRIES")? {
            builder = builder.max_retries(n);
        }
        if let Some(secs) = env_parse::<f64>("DATAAPI_RETRY_DELAY_SECS")? {
            builder = builder.retry_delay_secs(secs);
        }
        if let Ok(ua) = env::var("DATAAPI_USER_AGENT") {
            builder = builder.user_agent(ua);
        }
        if let Ok(raw) = env::var("DATAAPI_VERIFY_SSL") {
            let verify = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(invalid(
                        "DATAAPI_VERIFY_SSL",
                        format!("expected a boolean, got {:?}", raw),
                    ))
                }
            };
            builder = builder.verify_ssl(verify);
        }
        builder.build()
    }

    /// Base endpoint, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// The path is always relative: leading `/` characters are stripped so the
    /// base URL's own path (e.g. `/v1/`) is kept.
    pub fn endpoint_url(&self, path: &str) -> Result<Url> {
        let relative = path.trim_start_matches('/');
        self.base_url.join(relative).map_err(|e| {
            Error::validation_with_context(
                format!("Invalid endpoint path {:?}: {}", path, e),
                ErrorContext::new().with_source("endpoint_url"),
            )
        })
    }

    /// Headers sent with every request, before authentication headers.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(ua) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers
    }

    /// Upper bound for one logical call: every attempt runs into the
    /// per-attempt timeout and every backoff is slept in full.
    ///
    /// `timeout * (1 + max_retries) + retry_delay * (2^max_retries - 1)`
    pub fn worst_case_call_duration(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff_units = 1u32
            .checked_shl(self.max_retries)
            .map(|v| v - 1)
            .unwrap_or(u32::MAX);
        self.timeout
            .saturating_mul(attempts)
            .saturating_add(self.retry_delay.saturating_mul(backoff_units))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: normalize_base_url(DEFAULT_BASE_URL)
                .unwrap_or_else(|_| unreachable!("default base URL is valid")),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: default_user_agent(),
            verify_ssl: true,
        }
    }
}

/// Builder for [`ClientConfig`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    user_agent: String,
    verify_ssl: bool,
    rejected: Option<(&'static str, String)>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: default_user_agent(),
            verify_ssl: true,
            rejected: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Per-attempt timeout. Must be positive.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-attempt timeout in (fractional) seconds.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            self.rejected = Some(("timeout", "must be greater than 0".to_string()));
        } else {
            match Duration::try_from_secs_f64(secs) {
                Ok(d) => self.timeout = d,
                Err(_) => self.rejected = Some(("timeout", "is out of range".to_string())),
            }
        }
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Base backoff delay; attempt `n` waits `retry_delay * 2^n`.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Base backoff delay in (fractional) seconds. Must not be negative.
    pub fn retry_delay_secs(mut self, secs: f64) -> Self {
        if !secs.is_finite() || secs < 0.0 {
            self.rejected = Some(("retry_delay", "must not be negative".to_string()));
        } else {
            match Duration::try_from_secs_f64(secs) {
                Ok(d) => self.retry_delay = d,
                Err(_) => self.rejected = Some(("retry_delay", "is out of range".to_string())),
            }
        }
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        if let Some((field, reason)) = self.rejected {
            return Err(invalid(field, reason));
        }
        if self.timeout.is_zero() {
            return Err(invalid("timeout", "must be greater than 0"));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(invalid("user_agent", "is not a valid header value"));
        }
        let base_url = normalize_base_url(&self.base_url)?;

        Ok(ClientConfig {
            base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            user_agent: self.user_agent,
            verify_ssl: self.verify_ssl,
        })
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| invalid("base_url", format!("{:?} is not an absolute URL: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(
            "base_url",
            format!("{:?} must be an http(s) URL with a host", raw),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    Error::validation_with_context(
        format!("Invalid client configuration: {} {}", field, reason),
        ErrorContext::new()
            .with_details(serde_json::json!([{ "field": field, "message": reason }]))
            .with_source("config"),
    )
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, format!("could not parse {:?}", raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url().as_str(), "https://api.dataapi.com/v1/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert!(config.user_agent().starts_with("dataapi-rust/"));
        assert!(config.verify_ssl());
        assert_eq!(ClientConfig::builder().build().unwrap(), config);
    }

    #[test]
    fn test_fields_round_trip() {
        let config = ClientConfig::builder()
            .base_url("https://custom.api.com/api/v2")
            .timeout_secs(60.0)
            .max_retries(5)
            .retry_delay_secs(2.5)
            .user_agent("Custom-Agent/1.0")
            .verify_ssl(false)
            .build()
            .unwrap();
        assert_eq!(config.base_url().as_str(), "https://custom.api.com/api/v2/");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_retries(), 5);
        assert_eq!(config.retry_delay(), Duration::from_millis(2500));
        assert_eq!(config.user_agent(), "Custom-Agent/1.0");
        assert!(!config.verify_ssl());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = vec![
            ClientConfig::builder().timeout_secs(-1.0),
            ClientConfig::builder().timeout_secs(0.0),
            ClientConfig::builder().timeout(Duration::ZERO),
            ClientConfig::builder().retry_delay_secs(-0.5),
            ClientConfig::builder().base_url("not-a-url"),
            ClientConfig::builder().base_url("/relative/path"),
            ClientConfig::builder().base_url("ftp://files.example.com"),
        ];
        for builder in cases {
            let err = builder.clone().build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", builder);
            assert!(err.message().starts_with("Invalid client configuration"));
        }
    }

    #[test]
    fn test_zero_retries_and_delay_allowed() {
        let config = ClientConfig::builder()
            .max_retries(0)
            .retry_delay_secs(0.0)
            .build()
            .unwrap();
        assert_eq!(config.max_retries(), 0);
        assert_eq!(config.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint_url("/databases/db_1").unwrap().as_str(),
            "https://api.dataapi.com/v1/databases/db_1"
        );
        assert_eq!(
            config.endpoint_url("health").unwrap().as_str(),
            "https://api.dataapi.com/v1/health"
        );
    }

    #[test]
    fn test_default_headers() {
        let config = ClientConfig::builder().user_agent("Test-Agent/1.0").build().unwrap();
        let headers = config.default_headers();
        assert_eq!(headers[USER_AGENT], "Test-Agent/1.0");
        assert_eq!(headers[ACCEPT], "application/json");
    }

    #[test]
    fn test_worst_case_call_duration() {
        let config = ClientConfig::builder()
            .timeout_secs(30.0)
            .max_retries(3)
            .retry_delay_secs(1.0)
            .build()
            .unwrap();
        // 30s * 4 attempts + 1s * (1 + 2 + 4)
        assert_eq!(config.worst_case_call_duration(), Duration::from_secs(127));

        let no_retry = ClientConfig::builder().max_retries(0).build().unwrap();
        assert_eq!(no_retry.worst_case_call_duration(), Duration::from_secs(30));
    }
}
