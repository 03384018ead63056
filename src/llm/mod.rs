//! LLM client trait, retry policy and providers
//!
//! Providers are stateless request/response clients that send one request
//! per call. Transient failures and rate-limit signals are handed back to the
//! reasoning loop, which retries through its rate limiter using the
//! provider's [`RetryPolicy`].

use crate::config::{LlmProvider, LlmSettings};
use crate::error::AnalysisError;
use crate::models::ChatTurn;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub mod gemini;
pub mod groq;
pub mod mock;

pub use gemini::GeminiClient;
pub use groq::GroqClient;
pub use mock::{RecordedCall, ScriptedClient};

/// Text-completion service used by every role
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// `prompt` is the system instruction block; `history` the ordered turns
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String>;

    fn model(&self) -> &str;

    /// How transient failures of this provider are retried
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }
}

/// Providers stop generating before a model invents its own tool result
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Build the configured provider
pub fn build_client(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match settings.provider {
        LlmProvider::Groq => Arc::new(GroqClient::new(settings)?),
        LlmProvider::Gemini => Arc::new(GeminiClient::new(settings)?),
    };
    Ok(client)
}

/// Retry policy for transient provider failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(backoff_ms as u64).min(self.max_backoff)
    }

    /// Decide what follows failed attempt number `attempt` (1-based).
    /// Transient errors with attempts left yield the backoff to wait;
    /// exhausted retries surface as `ProviderError`, anything else as is.
    pub fn after_failure(&self, attempt: u32, error: AnalysisError) -> Result<Duration> {
        match error {
            AnalysisError::ProviderTransient(_) if attempt < self.max_attempts.max(1) => {
                Ok(self.backoff_duration(attempt))
            }
            AnalysisError::ProviderTransient(message) => Err(AnalysisError::ProviderError(format!(
                "provider call failed after {} attempts: {}",
                attempt, message
            ))),
            other => Err(other),
        }
    }
}

/// Map a non-success HTTP status to the error taxonomy
pub(crate) fn classify_status(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    provider: &str,
) -> AnalysisError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        AnalysisError::RateLimitExceeded { retry_after }
    } else if status.is_server_error() || status == reqwest::StatusCode::REQUEST_TIMEOUT {
        AnalysisError::ProviderTransient(format!("{} returned {}: {}", provider, status, body))
    } else {
        AnalysisError::ProviderError(format!("{} returned {}: {}", provider, status, body))
    }
}

/// Map a transport failure to the error taxonomy
pub(crate) fn classify_transport(error: reqwest::Error, provider: &str) -> AnalysisError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        AnalysisError::ProviderTransient(format!("{} request failed: {}", provider, error))
    } else {
        AnalysisError::ProviderError(format!("{} request failed: {}", provider, error))
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_duration(10), Duration::from_secs(8));
    }

    #[test]
    fn test_transient_errors_get_backoff_until_exhausted() {
        let policy = RetryPolicy::with_max_attempts(3);

        let first = policy.after_failure(1, AnalysisError::ProviderTransient("503".to_string()));
        assert_eq!(first.unwrap(), Duration::from_millis(500));
        let second = policy.after_failure(2, AnalysisError::ProviderTransient("503".to_string()));
        assert_eq!(second.unwrap(), Duration::from_millis(1000));

        let exhausted = policy.after_failure(3, AnalysisError::ProviderTransient("502".to_string()));
        assert!(matches!(exhausted, Err(AnalysisError::ProviderError(msg)) if msg.contains("after 3 attempts")));
    }

    #[test]
    fn test_non_transient_errors_are_not_retried() {
        let policy = RetryPolicy::default();

        let fatal = policy.after_failure(1, AnalysisError::ProviderError("401".to_string()));
        assert!(matches!(fatal, Err(AnalysisError::ProviderError(msg)) if msg == "401"));

        let limited = policy.after_failure(1, AnalysisError::RateLimitExceeded { retry_after: None });
        assert!(matches!(limited, Err(AnalysisError::RateLimitExceeded { .. })));
    }

    #[test]
    fn test_status_classification() {
        let limited = classify_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "",
            "groq",
        );
        assert!(matches!(
            limited,
            AnalysisError::RateLimitExceeded { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));

        let unavailable =
            classify_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, None, "down", "groq");
        assert!(unavailable.is_transient());

        let unauthorized =
            classify_status(reqwest::StatusCode::UNAUTHORIZED, None, "bad key", "groq");
        assert!(matches!(unauthorized, AnalysisError::ProviderError(_)));
    }
}
