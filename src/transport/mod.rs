//! Network transport seam.
//!
//! The executor talks to the network only through [`Transport`]. The default
//! implementation is [`HttpTransport`] (reqwest); tests plug in scripted
//! transports through a [`TransportFactory`].

mod http;

pub use http::HttpTransport;

use crate::error::BoxError;
use crate::{ClientConfig, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One fully prepared HTTP request attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// A completed HTTP exchange, successful or not.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// `application/json` or any `+json` media type.
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| {
                let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
                essence == "application/json" || essence.ends_with("+json")
            })
            .unwrap_or(false)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure before a complete response was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("transport error: {0}")]
    Other(#[source] BoxError),

    #[error("request could not be built: {0}")]
    Build(#[source] BoxError),
}

/// Sends prepared requests. One instance serves many concurrent calls.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError>;
}

/// Creates the transport lazily on first use, once per executor.
pub type TransportFactory = Arc<dyn Fn(&ClientConfig) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Factory producing the reqwest-backed [`HttpTransport`].
pub fn http_transport_factory() -> TransportFactory {
    Arc::new(|config: &ClientConfig| {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config)?);
        Ok(transport)
    })
}
