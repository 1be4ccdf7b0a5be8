//! Utility modules for sgav-validator

pub mod cache;
pub mod retry;

pub use cache::ReadThroughCache;
pub use retry::{RetryError, RetryPolicy, RetryStop, Retryable};
