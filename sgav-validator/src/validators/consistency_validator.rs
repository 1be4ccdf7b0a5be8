//! Consistency Validator
//!
//! Cross-checks the user's candidate address against the canonical record
//! and the property type, producing the final `ValidationResult`.
//!
//! # Consistency Checks (in order)
//! 1. **Postal code known**: no canonical record → `POSTAL_CODE_NOT_FOUND`, stop
//! 2. **Block**: compared after normalization (`BLOCK_MISMATCH`); skipped when
//!    the record has no block; advisory `MISSING_BLOCK_NUMBER` when only the
//!    record has one
//! 3. **Street**: similarity against the canonical street (`STREET_MISMATCH`);
//!    advisory `MISSING_STREET_NAME` when none was extracted
//! 4. **Unit presence**: by property type, `MISSING_UNIT_NUMBER` for strata
//!    types, `UNIT_NUMBER_UNVERIFIABLE` when the type is `UNKNOWN`
//! 5. **Unit format**: outside the `#LL-UUU` family → `UNIT_NUMBER_FORMAT_SUSPECT`
//!
//! # Block Normalization
//! Upper-case, leading zeros dropped (`0123` == `123`). With
//! `strip_block_suffix`, one trailing letter after a digit is dropped as well
//! (`113A` == `113`).

use crate::types::{
    AddressField, CanonicalRecord, IssueCode, NormalizedAddress, PropertyType, ValidationIssue,
    ValidationResult,
};
use crate::validators::street_matcher::StreetMatcher;
use once_cell::sync::Lazy;
use regex::Regex;
use sgav_common::config::ValidationConfig;
use tracing::debug;

/// Accepted unit designator family: `#12-345`, `#B1-05`, `#03-112A`
static UNIT_FAMILY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#B?[0-9]{1,3}-[0-9]{1,5}[A-Z]?$").expect("static regex"));

pub struct ConsistencyValidator {
    street_matcher: StreetMatcher,
    strip_block_suffix: bool,
}

impl ConsistencyValidator {
    pub fn new(street_matcher: StreetMatcher, strip_block_suffix: bool) -> Self {
        Self {
            street_matcher,
            strip_block_suffix,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(
            StreetMatcher::new(
                &config.street_abbreviations,
                config.street_similarity_threshold,
            ),
            config.strip_block_suffix,
        )
    }

    /// Property type is only consulted when no unit was extracted
    pub fn needs_property_type(address: &NormalizedAddress) -> bool {
        address.unit.is_none()
    }

    /// Run the checks and build the result
    ///
    /// `prior_issues` are extraction-time findings; cross-check issues are
    /// appended after them.
    pub fn validate(
        &self,
        address: &NormalizedAddress,
        canonical: Option<&CanonicalRecord>,
        property_type: Option<PropertyType>,
        prior_issues: Vec<ValidationIssue>,
    ) -> ValidationResult {
        let mut issues = prior_issues;

        // Check 1: postal code known
        let Some(record) = canonical else {
            let postal = address
                .postal_code
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default();
            issues.push(ValidationIssue::new(
                IssueCode::PostalCodeNotFound,
                AddressField::PostalCode,
                format!("Postal code {} does not exist", postal),
            ));
            return ValidationResult::new(issues, address.clone(), None, None);
        };

        // Check 2: block
        self.check_block(address, record, &mut issues);

        // Check 3: street
        self.check_street(address, record, &mut issues);

        // Check 4: unit presence by property type
        if address.unit.is_none() {
            check_unit_presence(property_type.unwrap_or(PropertyType::Unknown), &mut issues);
        }

        // Check 5: unit format
        if let Some(unit) = &address.unit {
            if !UNIT_FAMILY.is_match(unit) {
                issues.push(ValidationIssue::new(
                    IssueCode::UnitNumberFormatSuspect,
                    AddressField::Unit,
                    format!("Unit number {} is not in #LL-UUU form", unit),
                ));
            }
        }

        debug!(
            postal = %record.postal_code,
            issues = issues.len(),
            "Consistency checks complete"
        );

        ValidationResult::new(issues, address.clone(), Some(record.clone()), property_type)
    }

    fn check_block(
        &self,
        address: &NormalizedAddress,
        record: &CanonicalRecord,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(canonical_block) = &record.canonical_block else {
            return;
        };

        match &address.block {
            Some(block) => {
                if self.normalize_block(block) != self.normalize_block(canonical_block) {
                    issues.push(ValidationIssue::new(
                        IssueCode::BlockMismatch,
                        AddressField::Block,
                        format!(
                            "Block {} does not match block {} on record for {}",
                            block, canonical_block, record.postal_code
                        ),
                    ));
                }
            }
            None => issues.push(ValidationIssue::new(
                IssueCode::MissingBlockNumber,
                AddressField::Block,
                format!("No block number given; record has block {}", canonical_block),
            )),
        }
    }

    fn check_street(
        &self,
        address: &NormalizedAddress,
        record: &CanonicalRecord,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(street) = &address.street else {
            issues.push(ValidationIssue::new(
                IssueCode::MissingStreetName,
                AddressField::Street,
                format!("No street name given; record has {}", record.canonical_street),
            ));
            return;
        };

        let score = self
            .street_matcher
            .similarity(street, &record.canonical_street);
        if score < self.street_matcher.threshold() {
            issues.push(ValidationIssue::new(
                IssueCode::StreetMismatch,
                AddressField::Street,
                format!(
                    "Street {:?} does not match {:?} on record (similarity {:.2})",
                    street, record.canonical_street, score
                ),
            ));
        }
    }

    fn normalize_block(&self, block: &str) -> String {
        let mut block = block.trim().to_ascii_uppercase();

        if self.strip_block_suffix {
            let bytes = block.as_bytes();
            if bytes.len() >= 2
                && bytes[bytes.len() - 1].is_ascii_alphabetic()
                && bytes[bytes.len() - 2].is_ascii_digit()
            {
                block.pop();
            }
        }

        let trimmed = block.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

fn check_unit_presence(property_type: PropertyType, issues: &mut Vec<ValidationIssue>) {
    match property_type.requires_unit() {
        Some(true) => issues.push(ValidationIssue::new(
            IssueCode::MissingUnitNumber,
            AddressField::Unit,
            format!("{} address requires a unit number", property_type),
        )),
        Some(false) => {}
        None => issues.push(ValidationIssue::new(
            IssueCode::UnitNumberUnverifiable,
            AddressField::Unit,
            "Property type unknown; cannot tell whether a unit number is required",
        )),
    }
}
