//! Error classification: HTTP responses and transport failures to [`Error`].

use crate::transport::TransportError;
use crate::{Error, ErrorContext, ErrorKind, NetworkFailure};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

/// Classifies a non-success response.
///
/// `body` is the parsed JSON body when the response had one; `raw_text` is
/// the undecoded body text and is used as the message when the body carries
/// none.
pub fn classify_response(status: u16, body: Option<&Value>, raw_text: Option<&str>) -> Error {
    let kind = ErrorKind::from_http_status(status);
    let obj = body.and_then(Value::as_object);

    let message = obj
        .and_then(message_from_body)
        .or_else(|| {
            raw_text
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {} error", status));

    let mut context = ErrorContext::new().with_status_code(status);
    if let Some(obj) = obj {
        if let Some(code) = error_code(obj) {
            context = context.with_error_code(code);
        }
        if let Some(details) = structured_details(obj) {
            context = context.with_details(details);
        }
        if kind == ErrorKind::RateLimited {
            if let Some(secs) = obj.get("retry_after").and_then(seconds) {
                context = context.with_retry_after(secs);
            }
        }
    }

    Error::from_kind(kind, message, context)
}

/// Classifies a failure that produced no response.
pub fn classify_transport(err: TransportError) -> Error {
    let (message, failure) = match &err {
        TransportError::Timeout(after) => (
            format!("Request timed out after {:.1}s", after.as_secs_f64()),
            Some(NetworkFailure::Timeout),
        ),
        TransportError::Connect(source) => (
            format!("Connection failed: {}", source),
            Some(NetworkFailure::Connect),
        ),
        TransportError::Other(source) => {
            (format!("Network error: {}", source), Some(NetworkFailure::Other))
        }
        TransportError::Build(source) => (format!("Invalid request: {}", source), None),
    };
    let base = match failure {
        Some(failure) => Error::network(message, failure),
        None => Error::validation_with_context(message, ErrorContext::new().with_source("transport")),
    };
    base.with_cause(err)
}

/// `Retry-After: <seconds>` header. The HTTP-date form is not supported.
pub fn retry_after_header(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

fn non_blank(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn message_from_body(obj: &serde_json::Map<String, Value>) -> Option<String> {
    if let Some(m) = obj.get("message").and_then(non_blank) {
        return Some(m);
    }
    match obj.get("error") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
        Some(Value::Object(nested)) => {
            let m = nested
                .get("message")
                .and_then(non_blank)
                .or_else(|| nested.get("description").and_then(non_blank));
            if m.is_some() {
                return m;
            }
        }
        _ => {}
    }
    obj.get("detail").and_then(non_blank)
}

fn error_code(obj: &serde_json::Map<String, Value>) -> Option<String> {
    let raw = obj
        .get("error_code")
        .or_else(|| obj.get("error").and_then(|e| e.get("code")))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn structured_details(obj: &serde_json::Map<String, Value>) -> Option<Value> {
    if let Some(v @ (Value::Array(_) | Value::Object(_))) = obj.get("details") {
        return Some(v.clone());
    }
    obj.get("detail").filter(|v| v.is_array()).cloned()
}

fn seconds(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.ceil() as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_message_precedence() {
        let cases = [
            (json!({"message": "m", "error": "e", "detail": "d"}), "m"),
            (json!({"error": "e", "detail": "d"}), "e"),
            (json!({"error": {"message": "nested"}}), "nested"),
            (json!({"error": {"description": "described"}}), "described"),
            (json!({"detail": "d"}), "d"),
            (json!({"message": "  "}), "raw body"),
        ];
        for (body, expected) in cases {
            let err = classify_response(400, Some(&body), Some("raw body"));
            assert_eq!(err.message(), expected, "body {}", body);
        }
    }

    #[test]
    fn test_generic_message_without_body() {
        let err = classify_response(502, None, Some("   "));
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.message(), "HTTP 502 error");
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn test_unknown_status_keeps_code() {
        let err = classify_response(418, Some(&json!({"message": "teapot"})), None);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.status_code(), Some(418));
    }

    #[test]
    fn test_error_code_and_details() {
        let body = json!({
            "message": "Validation failed",
            "error_code": "INVALID_FIELD",
            "details": [{"field": "name", "message": "is required"}]
        });
        let err = classify_response(422, Some(&body), None);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.error_code(), Some("INVALID_FIELD"));
        assert!(err.to_string().contains("name: is required"));

        let nested = json!({"error": {"code": "DB_LOCKED", "message": "Locked"}});
        let err = classify_response(409, Some(&nested), None);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.error_code(), Some("DB_LOCKED"));
        assert_eq!(err.message(), "Locked");
    }

    #[test]
    fn test_fastapi_detail_array() {
        let body = json!({"detail": [{"loc": ["body", "name"], "msg": "field required"}]});
        let err = classify_response(422, Some(&body), Some("{...}"));
        assert!(err.details().is_some());
        assert!(err.to_string().contains("body.name: field required"));
    }

    #[test]
    fn test_retry_after_only_for_rate_limit() {
        let body = json!({"message": "slow down", "retry_after": 30});
        let err = classify_response(429, Some(&body), None);
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(30));

        let err = classify_response(503, Some(&body), None);
        assert_eq!(err.retry_after(), None);

        let fractional = json!({"retry_after": 1.2});
        assert_eq!(classify_response(429, Some(&fractional), None).retry_after(), Some(2));
    }

    #[test]
    fn test_transport_failures() {
        let err = classify_transport(TransportError::Timeout(Duration::from_secs(30)));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_timeout());
        assert!(err.is_retryable());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = classify_transport(TransportError::Connect(Box::new(io)));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());

        let io = std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad url");
        let err = classify_transport(TransportError::Build(Box::new(io)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_header(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after_header(&headers), Some(12));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after_header(&headers), None);
    }
}
