//! Validation reports
//!
//! Caller-facing envelope around one pipeline outcome: the raw input, a
//! timestamp, and either the `ValidationResult` or the pipeline error code.

use crate::error::PipelineError;
use crate::types::ValidationResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub raw_input: String,
    pub validated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationReport {
    pub fn new(raw_input: impl Into<String>, outcome: Result<ValidationResult, PipelineError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(err) => (
                None,
                Some(ReportError {
                    code: err.code(),
                    message: err.to_string(),
                }),
            ),
        };

        Self {
            raw_input: raw_input.into(),
            validated_at: sgav_common::time::now(),
            result,
            error,
        }
    }

    /// True when the pipeline failed to produce a result
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
