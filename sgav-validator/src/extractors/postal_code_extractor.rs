//! Postal Code Extractor
//!
//! Confirms the normalizer's postal candidate, repairing separator noise
//! (`560 123`, `560-123`) when exactly six digits remain. Anything else
//! produces a blocking issue and stops the pipeline before any lookup.

use crate::extractors::address_normalizer::PostalCandidate;
use crate::types::{AddressField, IssueCode, PostalCode, ValidationIssue};
use tracing::debug;

/// Turn a postal candidate into a confirmed code or a blocking issue
pub fn extract(candidate: &PostalCandidate) -> Result<PostalCode, ValidationIssue> {
    let raw = match candidate {
        PostalCandidate::Absent => {
            return Err(ValidationIssue::new(
                IssueCode::MissingPostalCode,
                AddressField::PostalCode,
                "No postal code found in address",
            ))
        }
        PostalCandidate::Found(raw) => raw,
    };

    if let Some(code) = PostalCode::parse(raw) {
        return Ok(code);
    }

    let separators_only = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-'));
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    match PostalCode::parse(&digits) {
        Some(code) if separators_only => {
            debug!(candidate = %raw, repaired = %code, "Repaired postal code separators");
            Ok(code)
        }
        _ => Err(ValidationIssue::new(
            IssueCode::MalformedPostalCode,
            AddressField::PostalCode,
            format!(
                "Postal code candidate {:?} is not 6 digits ({} digits found)",
                raw,
                digits.len()
            ),
        )),
    }
}
