//! Transient-failure classification and backoff.
//!
//! Only infrastructure-shaped failures retry: rate limits, timeouts,
//! network errors, and server errors. Auth failures, content filtering,
//! and malformed requests fail immediately and are recorded as
//! trust-affecting signals by the orchestrator instead of being retried.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Failure classification derived from error text and provider hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    RateLimit,
    Timeout,
    Network,
    ServerError,
    AuthFailure,
    ContentFilter,
    MalformedRequest,
    Unknown,
}

impl ErrorClass {
    /// Classify an error message by its shape.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("too many requests") || lower.contains("429")
        {
            Self::RateLimit
        } else if lower.contains("timed out") || lower.contains("timeout") {
            Self::Timeout
        } else if lower.contains("connection")
            || lower.contains("network")
            || lower.contains("dns")
            || lower.contains("unreachable")
        {
            Self::Network
        } else if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("server error")
        {
            Self::ServerError
        } else if lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
        {
            Self::AuthFailure
        } else if lower.contains("content filter") || lower.contains("filtered") {
            Self::ContentFilter
        } else if lower.contains("malformed") || lower.contains("invalid request") || lower.contains("400")
        {
            Self::MalformedRequest
        } else {
            Self::Unknown
        }
    }

    /// Whether a failure of this class is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Timeout | Self::Network | Self::ServerError
        )
    }

    /// Whether the failure should count against the agent's trust.
    pub fn is_trust_affecting(&self) -> bool {
        matches!(
            self,
            Self::AuthFailure | Self::ContentFilter | Self::MalformedRequest
        )
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fractional jitter applied to every computed delay
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (attempt 1 = first retry).
    ///
    /// A provider-supplied `retry_after` hint overrides the exponential
    /// schedule, still capped at `max_delay`.
    pub fn backoff_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }

        let exponent = attempt.saturating_sub(1).min(16);
        let raw = self.base_delay.as_millis() as f64 * 2_f64.powi(exponent as i32);
        let capped = raw.min(self.max_delay.as_millis() as f64);

        let spread = rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        let jittered = (capped * (1.0 + spread)).max(0.0);
        Duration::from_millis(jittered as u64)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn allows_retry(&self, attempt: u32, class: ErrorClass) -> bool {
        class.is_retryable() && attempt < self.max_attempts
    }
}
