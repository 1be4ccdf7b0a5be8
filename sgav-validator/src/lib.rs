//! sgav-validator library interface
//!
//! Normalization and validation pipeline for Singapore addresses.
//!
//! # Architecture
//! - **extractors** - raw text → candidate address and postal code (pure)
//! - **services** - postal lookup and property classification providers
//! - **validators** - candidate vs canonical cross-checks
//! - **workflow** - per-request orchestration, batch runs, reports
//! - **utils** - retry policy and read-through cache shared by the services

pub mod config;
pub mod error;
pub mod extractors;
pub mod services;
pub mod types;
pub mod utils;
pub mod validators;
pub mod workflow;

pub use crate::error::{LookupError, PipelineError, ProviderError};
pub use crate::types::{
    CanonicalRecord, IssueCode, NormalizedAddress, PostalCode, PropertyType, Severity,
    ValidationIssue, ValidationResult, Verdict,
};
pub use crate::workflow::{ValidationPipeline, ValidationReport};
