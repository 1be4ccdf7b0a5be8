//! Properties that hold across many inputs
//!
//! **Coverage:**
//! - Normalization is idempotent on its own rendering
//! - Validating the same input twice gives an identical result
//! - Addresses rendered from canonical records validate cleanly
//! - Adding a blocking condition never leaves the verdict at VALID
//! - Any clean 6-digit run is found as a postal code

mod helpers;

use helpers::*;
use sgav_validator::extractors::{normalize, postal_code_extractor, PostalCandidate};
use sgav_validator::{CanonicalRecord, IssueCode, NormalizedAddress, PropertyType, Verdict};

/// Render a candidate address back into one line of text
fn render(address: &NormalizedAddress) -> String {
    let mut parts = Vec::new();
    if let Some(block) = &address.block {
        parts.push(format!("Blk {}", block));
    }
    if let Some(street) = &address.street {
        parts.push(street.clone());
    }
    if let Some(unit) = &address.unit {
        parts.push(unit.clone());
    }
    if let Some(code) = &address.postal_code {
        parts.push(format!("Singapore {}", code));
    }
    parts.join(", ")
}

/// Render a canonical record as a user would type it
fn render_record(record: &CanonicalRecord, label: &str) -> String {
    let mut text = String::new();
    if let Some(block) = &record.canonical_block {
        text.push_str(block);
        text.push(' ');
    }
    text.push_str(&record.canonical_street);
    let property_type = sgav_validator::services::LabelTable::builtin()
        .lookup(label)
        .unwrap_or(PropertyType::Unknown);
    if property_type.requires_unit() == Some(true) {
        text.push_str(" #01-01");
    }
    text.push(' ');
    text.push_str(record.postal_code.as_str());
    text
}

const MESSY_INPUTS: &[&str] = &[
    "Blk 123 Ang Mo Kio Ave 3 #12-345 560123",
    "blk 288e, jurong east st 21, #12-34, singapore 605288",
    "26 Ridout Rd, Singapore 248420",
    "10 Bayfront Avenue, #01-01, Marina Bay Sands, S(018956)",
    "Block 1 Bedok North Ave 1 unit 01-01 Singapore 469001",
    "Jalan Kayu 799999",
    "Blk 50 Commonwealth Drive",
    "123 Orchard Road 238839",
];

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_normalize_is_idempotent() {
    for raw in MESSY_INPUTS {
        let first = normalize(raw).address;
        let second = normalize(&render(&first)).address;

        assert_eq!(first.block, second.block, "block drifted for {:?}", raw);
        assert_eq!(first.unit, second.unit, "unit drifted for {:?}", raw);
        assert_eq!(
            first.postal_code, second.postal_code,
            "postal code drifted for {:?}",
            raw
        );
        assert_eq!(
            first.street.as_deref().map(str::to_uppercase),
            second.street.as_deref().map(str::to_uppercase),
            "street drifted for {:?}",
            raw
        );
    }
}

#[tokio::test]
async fn test_validation_is_repeatable() {
    let h = standard_harness();

    for raw in MESSY_INPUTS {
        let first = h.pipeline.validate(raw).await.unwrap();
        let second = h.pipeline.validate(raw).await.unwrap();
        assert_eq!(first, second, "{:?} changed between runs", raw);
    }

    // Fresh caches give the same answers as warm ones
    let cold = standard_harness();
    for raw in MESSY_INPUTS {
        let warm = h.pipeline.validate(raw).await.unwrap();
        assert_eq!(cold.pipeline.validate(raw).await.unwrap(), warm, "{:?}", raw);
    }
}

// ============================================================================
// Round Trip
// ============================================================================

#[tokio::test]
async fn test_rendered_canonical_records_are_valid() {
    let h = standard_harness();

    for (record, label) in known_premises() {
        let raw = render_record(&record, label);
        let result = h.pipeline.validate(&raw).await.unwrap();
        assert_eq!(
            result.verdict(),
            Verdict::Valid,
            "{:?} produced {:?}",
            raw,
            result.issue_codes()
        );
    }
}

// ============================================================================
// Monotonicity
// ============================================================================

#[tokio::test]
async fn test_blocking_conditions_never_valid() {
    let h = standard_harness();

    let baseline = h
        .pipeline
        .validate("Blk 123 Ang Mo Kio Ave 3 #12-345 560123")
        .await
        .unwrap();
    assert_eq!(baseline.verdict(), Verdict::Valid);

    let broken = [
        ("Blk 124 Ang Mo Kio Ave 3 #12-345 560123", IssueCode::BlockMismatch),
        ("Blk 123 Yishun Ring Road #12-345 560123", IssueCode::StreetMismatch),
        ("Blk 123 Ang Mo Kio Ave 3 560123", IssueCode::MissingUnitNumber),
        ("Blk 123 Ang Mo Kio Ave 3 #12-345 560124", IssueCode::PostalCodeNotFound),
        ("Blk 123 Ang Mo Kio Ave 3 #12-345 56012", IssueCode::MalformedPostalCode),
        ("Blk 123 Ang Mo Kio Ave 3 #12-345", IssueCode::MissingPostalCode),
    ];

    for (raw, expected) in broken {
        let result = h.pipeline.validate(raw).await.unwrap();
        assert_ne!(result.verdict(), Verdict::Valid, "{:?} was VALID", raw);
        assert_eq!(result.verdict(), Verdict::Invalid, "{:?}", raw);
        assert!(
            result.has_issue(expected),
            "{:?} missing {:?}, got {:?}",
            raw,
            expected,
            result.issue_codes()
        );
    }
}

// ============================================================================
// Postal Code Detection
// ============================================================================

#[test]
fn test_six_digit_run_never_reported_missing() {
    let inputs = [
        "560123",
        "S560123",
        "Singapore560123",
        "Blk 123 Ang Mo Kio Ave 3 #12-345 560123",
        "560123 Blk 123 Ang Mo Kio Ave 3",
        "Blk 123, 560123, Ang Mo Kio",
        "#01-01 (560123)",
        "Blk 1 Jln 2 #03-04 S(018956) Singapore",
    ];

    for raw in inputs {
        let parsed = normalize(raw);
        assert!(
            matches!(parsed.postal_candidate, PostalCandidate::Found(_)),
            "no candidate for {:?}",
            raw
        );
        let extracted = postal_code_extractor::extract(&parsed.postal_candidate);
        assert!(extracted.is_ok(), "{:?} rejected: {:?}", raw, extracted);
        assert!(
            !parsed
                .issues
                .iter()
                .any(|i| i.code == IssueCode::MissingPostalCode),
            "{:?}",
            raw
        );
    }
}
