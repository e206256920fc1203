//! Failures of one chat-completion request, and when to try it again.
//!
//! Evidence analysis is bounded by the analyzer's own timeout, so the retry
//! budget here only absorbs short provider hiccups. Anything that retrying
//! cannot fix (bad key, oversized evidence payload, garbage body) is returned
//! on the first attempt.

use std::time::Duration;
use thiserror::Error;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited (HTTP 429): {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },

    /// 4xx other than 429, e.g. an invalid key or an evidence payload the
    /// provider refuses (413)
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unreadable response: {0}")]
    Malformed(String),
}

impl LlmError {
    /// Classify a non-success HTTP response.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = body.to_string();
        match status {
            429 => LlmError::RateLimited {
                message,
                retry_after,
            },
            400..=499 => LlmError::Rejected { status, message },
            _ => LlmError::Provider { status, message },
        }
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::Provider { .. } | LlmError::Network(_)
        )
    }

    /// Exponential backoff for the given attempt, honoring `Retry-After`.
    fn backoff(&self, attempt: u32) -> Duration {
        let base_secs: u64 = match self {
            LlmError::RateLimited {
                retry_after: Some(retry_after),
                ..
            } => return *retry_after,
            LlmError::RateLimited { .. } => 5,
            LlmError::Provider { .. } => 2,
            _ => 1,
        };

        Duration::from_secs(base_secs.saturating_mul(2u64.saturating_pow(attempt))).min(MAX_BACKOFF)
    }
}

/// Retry budget for transient LLM errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Maximum total time to spend retrying
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after `error` on attempt `attempt` (0-based), or
    /// `None` when the error should be returned to the caller.
    pub fn next_delay(&self, error: &LlmError, attempt: u32, elapsed: Duration) -> Option<Duration> {
        if !error.is_transient() || attempt >= self.max_retries {
            return None;
        }

        let remaining = self.max_retry_duration.saturating_sub(elapsed);
        let delay = error.backoff(attempt).min(remaining);
        (!delay.is_zero()).then_some(delay)
    }
}
