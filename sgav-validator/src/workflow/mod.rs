//! Validation workflow
//!
//! - **pipeline** - per-address orchestration and batch runs
//! - **report** - caller-facing report envelope

pub mod pipeline;
pub mod report;

pub use pipeline::ValidationPipeline;
pub use report::{ReportError, ValidationReport};
