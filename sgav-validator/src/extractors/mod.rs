//! Address extractors
//!
//! Pure text processing that runs before any provider is consulted.
//!
//! # Extractors
//! 1. **address_normalizer** - raw text → candidate components
//! 2. **postal_code_extractor** - confirm or repair the postal candidate

pub mod address_normalizer;
pub mod postal_code_extractor;

pub use address_normalizer::{normalize, NormalizerOutput, PostalCandidate};
