use crate::error_kind::ErrorKind;
use serde_json::{json, Value};
use thiserror::Error;

/// Boxed underlying cause carried through [`std::error::Error::source`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error context shared by every error variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// HTTP status code of the response that produced the error, if any.
    pub status_code: Option<u16>,
    /// Platform-specific error code (e.g. `"DB_LOCKED"`).
    pub error_code: Option<String>,
    /// Structured detail from the error body, typically field-level validation errors.
    pub details: Option<Value>,
    /// Seconds the server asked us to wait (rate limiting).
    pub retry_after: Option<u64>,
    /// Component that raised the error (e.g. "oauth2", "response_shape").
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Which transport failure produced an [`Error::Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The attempt exceeded the configured timeout.
    Timeout,
    /// Connection refused, DNS resolution or TLS handshake failure.
    Connect,
    /// The connection broke while sending or reading.
    Other,
}

/// Classified error returned by every DataAPI call.
///
/// The variant set is closed; see [`ErrorKind`] for the mapping from HTTP
/// status codes and for retry semantics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", render(.message, .context))]
    Authentication {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Authorization {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Validation {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    NotFound {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Conflict {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    RateLimited {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Server {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Network {
        message: String,
        failure: NetworkFailure,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("{}", render(.message, .context))]
    Unknown {
        message: String,
        context: ErrorContext,
        #[source]
        cause: Option<BoxError>,
    },
}

// Display form: "<message> | Status: <code> | Code: <error_code> | Details: <a>; <b>"
fn render(message: &str, ctx: &ErrorContext) -> String {
    let mut parts = vec![message.to_string()];
    if let Some(status) = ctx.status_code {
        parts.push(format!("Status: {}", status));
    }
    if let Some(ref code) = ctx.error_code {
        parts.push(format!("Code: {}", code));
    }
    if let Some(ref details) = ctx.details {
        let lines = detail_messages(details);
        if !lines.is_empty() {
            parts.push(format!("Details: {}", lines.join("; ")));
        }
    }
    parts.join(" | ")
}

/// Flattens a `details` payload into readable per-field messages.
///
/// Accepts arrays of strings or of `{field|loc, message|msg}` objects, and
/// objects mapping field names to a message or a list of messages.
pub(crate) fn detail_messages(details: &Value) -> Vec<String> {
    match details {
        Value::Array(items) => items.iter().filter_map(detail_item).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(field, v)| format!("{}: {}", field, scalar_or_list(v)))
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn detail_item(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let field = obj
                .get("field")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    obj.get("loc").and_then(Value::as_array).map(|loc| {
                        loc.iter()
                            .map(|p| match p {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(".")
                    })
                });
            let msg = obj
                .get("message")
                .or_else(|| obj.get("msg"))
                .and_then(Value::as_str);
            match (field, msg) {
                (Some(f), Some(m)) => Some(format!("{}: {}", f, m)),
                (None, Some(m)) => Some(m.to_string()),
                _ => Some(item.to_string()),
            }
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn scalar_or_list(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

macro_rules! each_variant {
    ($self:expr, $bind:ident => $body:expr) => {
        match $self {
            Error::Authentication { $bind, .. }
            | Error::Authorization { $bind, .. }
            | Error::Validation { $bind, .. }
            | Error::NotFound { $bind, .. }
            | Error::Conflict { $bind, .. }
            | Error::RateLimited { $bind, .. }
            | Error::Server { $bind, .. }
            | Error::Network { $bind, .. }
            | Error::Unknown { $bind, .. } => $body,
        }
    };
}

impl Error {
    /// Builds an error of the given kind. `Network` errors built this way are
    /// tagged [`NetworkFailure::Other`].
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>, context: ErrorContext) -> Self {
        let message = message.into();
        let cause = None;
        match kind {
            ErrorKind::Authentication => Error::Authentication { message, context, cause },
            ErrorKind::Authorization => Error::Authorization { message, context, cause },
            ErrorKind::Validation => Error::Validation { message, context, cause },
            ErrorKind::NotFound => Error::NotFound { message, context, cause },
            ErrorKind::Conflict => Error::Conflict { message, context, cause },
            ErrorKind::RateLimited => Error::RateLimited { message, context, cause },
            ErrorKind::Server => Error::Server { message, context, cause },
            ErrorKind::Network => Error::Network {
                message,
                failure: NetworkFailure::Other,
                context,
                cause,
            },
            ErrorKind::Unknown => Error::Unknown { message, context, cause },
        }
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Authentication, msg, ErrorContext::new())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Validation, msg, ErrorContext::new())
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Self::from_kind(ErrorKind::Validation, msg, context)
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::Unknown, msg, ErrorContext::new())
    }

    pub fn network(msg: impl Into<String>, failure: NetworkFailure) -> Self {
        Error::Network {
            message: msg.into(),
            failure,
            context: ErrorContext::new(),
            cause: None,
        }
    }

    /// Attaches the underlying cause, replacing any previous one.
    pub fn with_cause(mut self, err: impl Into<BoxError>) -> Self {
        let err = err.into();
        each_variant!(&mut self, cause => *cause = Some(err));
        self
    }

    /// Replaces the structured context.
    pub fn with_context(mut self, ctx: ErrorContext) -> Self {
        each_variant!(&mut self, context => *context = ctx);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Authorization { .. } => ErrorKind::Authorization,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Server { .. } => ErrorKind::Server,
            Error::Network { .. } => ErrorKind::Network,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The bare message, without status or code decorations.
    pub fn message(&self) -> &str {
        each_variant!(self, message => message.as_str())
    }

    pub fn context(&self) -> &ErrorContext {
        each_variant!(self, context => context)
    }

    pub(crate) fn context_mut(&mut self) -> &mut ErrorContext {
        each_variant!(self, context => context)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.context().status_code
    }

    pub fn error_code(&self) -> Option<&str> {
        self.context().error_code.as_deref()
    }

    pub fn details(&self) -> Option<&Value> {
        self.context().details.as_ref()
    }

    /// Retry-after hint in seconds, only ever set on rate-limited errors.
    pub fn retry_after(&self) -> Option<u64> {
        self.context().retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().retryable()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Network {
                failure: NetworkFailure::Timeout,
                ..
            }
        )
    }

    /// Exports the error as a JSON object.
    pub fn to_json(&self) -> Value {
        let ctx = self.context();
        let mut out = json!({
            "type": self.kind().type_name(),
            "message": self.message(),
            "status_code": ctx.status_code,
            "error_code": ctx.error_code,
            "details": ctx.details.clone().unwrap_or_else(|| json!({})),
        });
        if let (Some(secs), Some(obj)) = (ctx.retry_after, out.as_object_mut()) {
            obj.insert("retry_after".to_string(), json!(secs));
        }
        out
    }
}
