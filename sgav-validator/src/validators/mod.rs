//! Validators
//!
//! - **street_matcher** - tolerant street name comparison
//! - **consistency_validator** - candidate vs canonical cross-checks

pub mod consistency_validator;
pub mod street_matcher;

pub use consistency_validator::ConsistencyValidator;
pub use street_matcher::StreetMatcher;
