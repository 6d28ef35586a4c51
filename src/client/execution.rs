//! Request execution: one logical call, retried per [`RetryPolicy`].
//!
//! `INIT -> HEADERS_ACQUIRED -> SENT -> {SUCCESS, CLASSIFIED_ERROR} -> (RETRY | TERMINAL)`

use super::core::Client;
use super::error_classification::{classify_response, classify_transport, retry_after_header};
use super::policy::{Decision, RetryPolicy};
use super::request::{ApiRequest, Payload};
use super::shape::{coerce, coerce_shaped, Shaped};
use super::types::CallStats;
use crate::transport::{HttpRequest, HttpResponse, TransportError};
use crate::{Error, ErrorContext, ErrorKind, Result};
use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Correlation header, constant across the retries of one call.
pub const REQUEST_ID_HEADER: &str = "x-dataapi-request-id";

impl Client {
    /// Executes a request and returns the decoded payload.
    pub async fn execute(&self, request: ApiRequest) -> Result<Payload> {
        self.execute_with_stats(request).await.map(|(payload, _)| payload)
    }

    /// Executes a request and deserializes the payload into `T`.
    pub async fn execute_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        coerce(self.execute(request).await?)
    }

    /// Executes a request, coercing an object into `Shaped::One` and an array
    /// into `Shaped::Many` element by element.
    pub async fn execute_shaped<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Shaped<T>> {
        coerce_shaped(self.execute(request).await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute_as(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute_as(ApiRequest::post(path).body(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute_as(ApiRequest::put(path).body(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.execute_as(ApiRequest::patch(path).body(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute_as(ApiRequest::delete(path)).await
    }

    /// Executes a request and reports attempts, backoff and timing.
    pub async fn execute_with_stats(&self, request: ApiRequest) -> Result<(Payload, CallStats)> {
        let url = self.request_url(&request)?;
        let body = request
            .json()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| Error::validation("Request body could not be serialized").with_cause(e))?
            .map(Bytes::from);
        let request_id = Uuid::new_v4().to_string();
        let policy = RetryPolicy::from_config(&self.config);
        let started = Instant::now();

        let mut attempt: u32 = 0;
        let mut backoff = Duration::ZERO;
        loop {
            debug!(
                method = %request.method(),
                endpoint = request.path(),
                attempt,
                request_id = request_id.as_str(),
                "dataapi request attempt"
            );

            let err = match self.attempt(&request, &url, body.clone(), &request_id).await {
                Ok(response) => {
                    let status = response.status;
                    let payload = decode_success(response)?;
                    let stats = CallStats {
                        request_id,
                        method: request.method().to_string(),
                        endpoint: request.path().to_string(),
                        attempts: attempt + 1,
                        backoff,
                        duration: started.elapsed(),
                        http_status: status,
                    };
                    return Ok((payload, stats));
                }
                Err(err) => err,
            };

            match policy.decide(&err, attempt) {
                Decision::Retry { delay } => {
                    warn!(
                        error_kind = err.kind().name(),
                        delay_ms = delay.as_millis() as u64,
                        attempt,
                        endpoint = request.path(),
                        "retrying dataapi request"
                    );
                    tokio::time::sleep(delay).await;
                    backoff += delay;
                    attempt += 1;
                }
                Decision::Fail => {
                    if let Some(status) = err.status_code() {
                        info!(
                            http_status = status,
                            error_kind = err.kind().name(),
                            endpoint = request.path(),
                            request_id = request_id.as_str(),
                            duration_ms = started.elapsed().as_millis() as u64,
                            "dataapi request failed"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }

    fn request_url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.config.endpoint_url(request.path())?;
        if !request.query_params().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_params());
        }
        Ok(url)
    }

    /// One attempt: fresh auth headers, send, classify.
    async fn attempt(
        &self,
        request: &ApiRequest,
        url: &Url,
        body: Option<Bytes>,
        request_id: &str,
    ) -> Result<HttpResponse> {
        let mut headers = self.config.default_headers();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        if let Ok(id) = HeaderValue::from_str(request_id) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), id);
        }
        // Auth last: it wins on a name collision.
        headers.extend(self.credentials.headers().await?);

        let timeout = self.config.timeout();
        let http_request = HttpRequest {
            method: request.method().clone(),
            url: url.clone(),
            headers,
            body,
            timeout,
        };

        let transport = self.transport()?;
        let response = match tokio::time::timeout(timeout, transport.send(http_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(classify_transport(err)),
            Err(_) => return Err(classify_transport(TransportError::Timeout(timeout))),
        };

        if response.is_success() {
            return Ok(response);
        }
        Err(classify_failure(&response))
    }
}

fn classify_failure(response: &HttpResponse) -> Error {
    let text = response.text();
    let parsed = serde_json::from_str::<Value>(&text).ok();
    let mut err = classify_response(response.status, parsed.as_ref(), Some(&text));
    if err.kind() == ErrorKind::RateLimited && err.retry_after().is_none() {
        if let Some(secs) = retry_after_header(&response.headers) {
            err.context_mut().retry_after = Some(secs);
        }
    }
    err
}

/// JSON content types decode to `Payload::Json` (empty body is `null`);
/// anything else is returned as text.
fn decode_success(response: HttpResponse) -> Result<Payload> {
    if !response.is_json() {
        return Ok(Payload::Text(response.text()));
    }
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::Json(Value::Null));
    }
    serde_json::from_slice(&response.body)
        .map(Payload::Json)
        .map_err(|e| {
            Error::from_kind(
                ErrorKind::Unknown,
                "Invalid JSON response",
                ErrorContext::new()
                    .with_status_code(response.status)
                    .with_source("response_decode"),
            )
            .with_cause(e)
        })
}
