//! # SGAV Common Library
//!
//! Shared code for the Singapore address validator crates:
//! - Error and result types
//! - TOML bootstrap configuration and config-file resolution
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
