use std::time::Duration;

/// Per-call statistics, returned by `execute_with_stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStats {
    /// Correlation id sent as `X-DataAPI-Request-Id`; identical on every attempt.
    pub request_id: String,
    pub method: String,
    pub endpoint: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Total time spent sleeping between attempts.
    pub backoff: Duration,
    pub duration: Duration,
    pub http_status: u16,
}

impl CallStats {
    pub fn retry_count(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}
