//! Error types for sgav-validator
//!
//! Three layers:
//! - `ProviderError`: one failed call to an external source
//! - `LookupError`: postal lookup gave up after retries
//! - `PipelineError`: a request could not produce a `ValidationResult`
//!
//! Address problems are never errors; they are `ValidationIssue`s.

use crate::utils::retry::Retryable;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to an external provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Per-call timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider asked us to slow down (HTTP 429)
    #[error("Rate limited by provider")]
    RateLimited,

    /// Provider-side failure (HTTP 5xx)
    #[error("Provider returned server error {0}")]
    Server(u16),

    /// Request refused as invalid (HTTP 4xx other than 429)
    #[error("Provider rejected request with status {0}")]
    Rejected(u16),

    /// Body could not be understood
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Map a non-success HTTP status; `None` for 2xx
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Some(ProviderError::RateLimited)
        } else if status.is_server_error() {
            Some(ProviderError::Server(status.as_u16()))
        } else {
            Some(ProviderError::Rejected(status.as_u16()))
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::Network(_)
                | ProviderError::RateLimited
                | ProviderError::Server(_)
        )
    }
}

/// Postal lookup could not reach a definitive answer
#[derive(Debug, Clone, Error)]
#[error("{provider} unavailable after {attempts} attempt(s): {source}")]
pub struct LookupError {
    pub provider: &'static str,
    pub attempts: u32,
    pub source: ProviderError,
}

/// Request-level failure, distinct from an INVALID verdict
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Postal lookup unavailable: {0}")]
    LookupUnavailable(#[from] LookupError),

    #[error("Validation exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },
}

impl PipelineError {
    /// Stable error code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::LookupUnavailable(_) | PipelineError::Timeout { .. } => {
                "LOOKUP_UNAVAILABLE"
            }
        }
    }
}
