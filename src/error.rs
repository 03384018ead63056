//! Error types for the financial document analyzer

use std::time::Duration;
use thiserror::Error;

/// Result type alias for analyzer operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Error, Debug)]
pub enum AnalysisError {

    // =============================
    // Reasoning Loop Errors
    // =============================

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Transient provider error: {0}")]
    ProviderTransient(String),

    #[error("Provider rate limit exceeded (retry after {retry_after:?})")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error("Run cancelled")]
    Cancelled,

    // =============================
    // Pipeline Errors
    // =============================

    #[error("{0}")]
    PipelineAbort(Box<PipelineAbort>),

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    /// Whether a provider call may be retried after backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::ProviderTransient(_))
    }

    /// Whether this error is, or was caused by, a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            AnalysisError::Cancelled => true,
            AnalysisError::PipelineAbort(abort) => abort.cause.is_cancelled(),
            _ => false,
        }
    }
}

/// Diagnostics for a run aborted because one of its tasks failed
#[derive(Error, Debug)]
#[error("Stage {task_index} '{task}' ({role}) failed after {iterations} iteration(s): {cause}")]
pub struct PipelineAbort {
    pub task_index: usize,
    pub task: String,
    pub role: String,
    pub iterations: u32,
    pub parse_failures: u32,
    pub last_response: Option<String>,
    #[source]
    pub cause: AnalysisError,
}

impl From<PipelineAbort> for AnalysisError {
    fn from(abort: PipelineAbort) -> Self {
        AnalysisError::PipelineAbort(Box::new(abort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_message_names_stage() {
        let err: AnalysisError = PipelineAbort {
            task_index: 2,
            task: "investment_analysis".to_string(),
            role: "Investment Advisor".to_string(),
            iterations: 1,
            parse_failures: 3,
            last_response: Some("???".to_string()),
            cause: AnalysisError::ParseError("too many unparseable responses".to_string()),
        }
        .into();

        let message = err.to_string();
        assert!(message.contains("Stage 2 'investment_analysis'"));
        assert!(message.contains("Investment Advisor"));
        assert!(message.contains("too many unparseable responses"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancellation_is_seen_through_abort() {
        let err: AnalysisError = PipelineAbort {
            task_index: 0,
            task: "verification".to_string(),
            role: "Financial Document Verifier".to_string(),
            iterations: 0,
            parse_failures: 0,
            last_response: None,
            cause: AnalysisError::Cancelled,
        }
        .into();

        assert!(err.is_cancelled());
        assert!(AnalysisError::ProviderTransient("503".into()).is_transient());
        assert!(!AnalysisError::ProviderError("401".into()).is_transient());
    }
}
