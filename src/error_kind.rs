//! Closed set of failure kinds produced by the request pipeline.
//!
//! Every [`crate::Error`] maps to exactly one [`ErrorKind`]. The kind decides
//! whether the executor retries a failed attempt.
//!
//! | Kind             | HTTP status     | Retried |
//! |------------------|-----------------|---------|
//! | `Authentication` | 401             | no      |
//! | `Authorization`  | 403             | no      |
//! | `Validation`     | 400, 422        | no      |
//! | `NotFound`       | 404             | no      |
//! | `Conflict`       | 409             | no      |
//! | `RateLimited`    | 429             | yes     |
//! | `Server`         | 500-599         | no      |
//! | `Network`        | (no response)   | yes     |
//! | `Unknown`        | anything else   | no      |
//!
//! ## Example
//!
//! ```rust
//! use dataapi::ErrorKind;
//!
//! let kind = ErrorKind::from_http_status(429);
//! assert_eq!(kind, ErrorKind::RateLimited);
//! assert!(kind.retryable());
//! assert_eq!(kind.name(), "rate_limited");
//! ```

use std::fmt;

/// Discriminant of a classified error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing, invalid or expired credentials.
    Authentication,
    /// Valid credentials without permission for the resource.
    Authorization,
    /// Rejected request input, or a response that does not fit the requested shape.
    Validation,
    /// The addressed resource does not exist.
    NotFound,
    /// The request conflicts with the current resource state.
    Conflict,
    /// Too many requests.
    RateLimited,
    /// Server-side failure (5xx).
    Server,
    /// No response was received: connection failure, DNS, TLS or timeout.
    Network,
    /// Anything the classifier does not recognize.
    Unknown,
}

impl ErrorKind {
    /// Returns the stable snake_case name (e.g. `"not_found"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the error type name used in JSON exports (e.g. `"NotFoundError"`).
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Authentication => "AuthenticationError",
            Self::Authorization => "AuthorizationError",
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::Conflict => "ConflictError",
            Self::RateLimited => "RateLimitError",
            Self::Server => "ServerError",
            Self::Network => "NetworkError",
            Self::Unknown => "UnknownError",
        }
    }

    /// Returns whether the executor retries this kind.
    ///
    /// Only transport failures and rate limiting are retried. Server errors are
    /// deliberately excluded.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network)
    }

    /// Maps an HTTP status code to its kind.
    ///
    /// Success codes have no meaningful kind and map to `Unknown`; callers only
    /// classify non-success responses.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            409 => Self::Conflict,
            400 | 422 => Self::Validation,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
