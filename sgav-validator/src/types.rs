//! Core Types and Trait Definitions for sgav-validator
//!
//! Defines the value types that flow through the validation pipeline and the
//! provider traits it depends on:
//! - **Extraction:** raw text → `NormalizedAddress` (+ `PostalCode`)
//! - **Lookup:** `PostalCode` → `CanonicalRecord` (`GeocodingSource`, `PostalLookup`)
//! - **Classification:** block/street → `PropertyType` (`ClassificationSource`, `PropertyClassifier`)
//! - **Validation:** candidate vs canonical → `ValidationResult`
//!
//! All values here are immutable once built. Corrections produce new values.

use crate::error::{LookupError, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::time::Instant;

// ============================================================================
// Address Types
// ============================================================================

/// Singapore postal code: exactly six ASCII digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Accept exactly six ASCII digits, nothing else
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() == 6 && value.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a 6-digit postal code: {:?}", value))
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

/// Structured candidate address extracted from raw user text
///
/// Every component is optional; `raw_remainder` keeps whatever text was not
/// assigned to a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedAddress {
    pub postal_code: Option<PostalCode>,
    pub block: Option<String>,
    pub street: Option<String>,
    /// Unit designator, normalized to `#LL-UUU` form when recognizable
    pub unit: Option<String>,
    /// Building or estate name, when a segment looks like one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    pub raw_remainder: String,
}

impl NormalizedAddress {
    /// Copy of this address carrying a confirmed postal code
    pub fn with_postal_code(&self, code: PostalCode) -> Self {
        Self {
            postal_code: Some(code),
            ..self.clone()
        }
    }
}

/// Authoritative address data for one postal code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub postal_code: PostalCode,
    /// `None` when the provider has no block (`NIL` or empty)
    #[serde(default)]
    pub canonical_block: Option<String>,
    pub canonical_street: String,
    #[serde(default)]
    pub building_name: Option<String>,
}

/// Property category inferred from classification labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Hdb,
    Condominium,
    Landed,
    Commercial,
    Unknown,
}

impl PropertyType {
    /// Whether a unit number is expected; `None` when it cannot be decided
    pub fn requires_unit(self) -> Option<bool> {
        match self {
            PropertyType::Hdb | PropertyType::Condominium | PropertyType::Commercial => Some(true),
            PropertyType::Landed => Some(false),
            PropertyType::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::Hdb => "HDB",
            PropertyType::Condominium => "CONDOMINIUM",
            PropertyType::Landed => "LANDED",
            PropertyType::Commercial => "COMMERCIAL",
            PropertyType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HDB" => Ok(PropertyType::Hdb),
            "CONDOMINIUM" | "CONDO" => Ok(PropertyType::Condominium),
            "LANDED" => Ok(PropertyType::Landed),
            "COMMERCIAL" => Ok(PropertyType::Commercial),
            "UNKNOWN" => Ok(PropertyType::Unknown),
            other => Err(format!("unknown property type: {}", other)),
        }
    }
}

// ============================================================================
// Validation Outcome Types
// ============================================================================

/// Issue taxonomy
///
/// Each code has a fixed severity, see [`IssueCode::severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingPostalCode,
    MalformedPostalCode,
    PostalCodeAmbiguous,
    PostalCodeNotFound,
    BlockMismatch,
    StreetMismatch,
    MissingBlockNumber,
    MissingStreetName,
    MissingUnitNumber,
    UnitNumberFormatSuspect,
    UnitNumberUnverifiable,
}

impl IssueCode {
    pub fn severity(self) -> Severity {
        match self {
            IssueCode::MissingPostalCode
            | IssueCode::MalformedPostalCode
            | IssueCode::PostalCodeNotFound
            | IssueCode::BlockMismatch
            | IssueCode::StreetMismatch
            | IssueCode::MissingUnitNumber => Severity::Blocking,
            IssueCode::PostalCodeAmbiguous
            | IssueCode::MissingBlockNumber
            | IssueCode::MissingStreetName
            | IssueCode::UnitNumberFormatSuspect
            | IssueCode::UnitNumberUnverifiable => Severity::Advisory,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::MissingPostalCode => "MISSING_POSTAL_CODE",
            IssueCode::MalformedPostalCode => "MALFORMED_POSTAL_CODE",
            IssueCode::PostalCodeAmbiguous => "POSTAL_CODE_AMBIGUOUS",
            IssueCode::PostalCodeNotFound => "POSTAL_CODE_NOT_FOUND",
            IssueCode::BlockMismatch => "BLOCK_MISMATCH",
            IssueCode::StreetMismatch => "STREET_MISMATCH",
            IssueCode::MissingBlockNumber => "MISSING_BLOCK_NUMBER",
            IssueCode::MissingStreetName => "MISSING_STREET_NAME",
            IssueCode::MissingUnitNumber => "MISSING_UNIT_NUMBER",
            IssueCode::UnitNumberFormatSuspect => "UNIT_NUMBER_FORMAT_SUSPECT",
            IssueCode::UnitNumberUnverifiable => "UNIT_NUMBER_UNVERIFIABLE",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking issues invalidate an address; advisory ones only flag it for review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocking,
    Advisory,
}

/// Address component an issue refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    PostalCode,
    Block,
    Street,
    Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    pub field: AddressField,
}

impl ValidationIssue {
    /// Create issue; severity always follows the code
    pub fn new(code: IssueCode, field: AddressField, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            field,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Valid,
    Invalid,
    NeedsReview,
}

impl Verdict {
    /// INVALID on any blocking issue, NEEDS_REVIEW on advisories only, else VALID
    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        if issues.iter().any(ValidationIssue::is_blocking) {
            Verdict::Invalid
        } else if issues.is_empty() {
            Verdict::Valid
        } else {
            Verdict::NeedsReview
        }
    }
}

/// Final outcome of validating one address
///
/// The verdict is derived from the issue list at construction and cannot be
/// set independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    verdict: Verdict,
    issues: Vec<ValidationIssue>,
    normalized_address: NormalizedAddress,
    canonical_record: Option<CanonicalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_type: Option<PropertyType>,
}

impl ValidationResult {
    pub fn new(
        issues: Vec<ValidationIssue>,
        normalized_address: NormalizedAddress,
        canonical_record: Option<CanonicalRecord>,
        property_type: Option<PropertyType>,
    ) -> Self {
        Self {
            verdict: Verdict::from_issues(&issues),
            issues,
            normalized_address,
            canonical_record,
            property_type,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn normalized_address(&self) -> &NormalizedAddress {
        &self.normalized_address
    }

    pub fn canonical_record(&self) -> Option<&CanonicalRecord> {
        self.canonical_record.as_ref()
    }

    /// Property type, present only when classification was consulted
    pub fn property_type(&self) -> Option<PropertyType> {
        self.property_type
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn issue_codes(&self) -> Vec<IssueCode> {
        self.issues.iter().map(|i| i.code).collect()
    }
}

// ============================================================================
// Provider Traits
// ============================================================================

/// One result row from a geocoding search, as the provider reported it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeHit {
    pub postal: String,
    #[serde(default)]
    pub block: Option<String>,
    pub street: String,
    #[serde(default)]
    pub building: Option<String>,
}

/// Raw geocoding provider (single call, no retry or cache)
#[async_trait]
pub trait GeocodingSource: Send + Sync {
    /// Provider name for logs and error reports
    fn name(&self) -> &'static str;

    /// Search by postal code. An empty list means the code is unknown.
    async fn search(&self, postal_code: &PostalCode) -> Result<Vec<GeocodeHit>, ProviderError>;
}

/// Query sent to the classification source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyQuery {
    pub block: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<PostalCode>,
}

impl PropertyQuery {
    /// Query built from the canonical record
    pub fn from_canonical(record: &CanonicalRecord) -> Self {
        Self {
            block: record.canonical_block.clone(),
            street: Some(record.canonical_street.clone()),
            postal_code: Some(record.postal_code.clone()),
        }
    }

    /// Cache key: upper-cased, whitespace-collapsed (block, street)
    pub fn cache_key(&self) -> (String, String) {
        fn fold(value: Option<&str>) -> String {
            value
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_uppercase()
        }
        (fold(self.block.as_deref()), fold(self.street.as_deref()))
    }

    /// Free-text search string (`<block> <street> <postal>`)
    pub fn search_text(&self) -> String {
        [
            self.block.as_deref(),
            self.street.as_deref(),
            self.postal_code.as_ref().map(PostalCode::as_str),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Raw classification provider (single call, no retry or cache)
#[async_trait]
pub trait ClassificationSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Category labels for the premises matching the query, in page order
    async fn categories(&self, query: &PropertyQuery) -> Result<Vec<String>, ProviderError>;
}

// ============================================================================
// Pipeline Capabilities
// ============================================================================

/// Postal-code lookup as the pipeline sees it (retry and cache included)
#[async_trait]
pub trait PostalLookup: Send + Sync {
    /// `Ok(None)` when the provider definitively knows no such code
    async fn lookup(
        &self,
        postal_code: &PostalCode,
        deadline: Instant,
    ) -> Result<Option<CanonicalRecord>, LookupError>;
}

/// Property classification as the pipeline sees it
///
/// Never fails: provider trouble degrades to `PropertyType::Unknown`.
#[async_trait]
pub trait PropertyClassifier: Send + Sync {
    async fn classify(&self, query: &PropertyQuery, deadline: Instant) -> PropertyType;
}
