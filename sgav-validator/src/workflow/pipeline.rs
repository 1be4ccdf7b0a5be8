//! Validation Pipeline
//!
//! Orchestrates one address through every stage:
//! normalize → confirm postal code → lookup → classify (if needed) → cross-check.
//!
//! # Error Handling
//! - Address problems become issues on the `ValidationResult`
//! - Missing or malformed postal codes stop before any provider call
//! - Lookup outages and the request budget surface as `PipelineError`
//! - Classification outages degrade to `UNKNOWN` inside the resolver
//!
//! # Concurrency
//! The pipeline holds no per-request state. Any number of requests may run
//! at once and share the provider caches.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = build_live_pipeline(&config)?;
//! let result = pipeline.validate("Blk 123 Ang Mo Kio Ave 3 #12-345 560123").await?;
//! assert_eq!(result.verdict(), Verdict::Valid);
//! ```

use crate::error::PipelineError;
use crate::extractors::{normalize, postal_code_extractor};
use crate::types::{PostalLookup, PropertyClassifier, PropertyQuery, ValidationResult};
use crate::validators::ConsistencyValidator;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct ValidationPipeline {
    lookup: Arc<dyn PostalLookup>,
    classifier: Arc<dyn PropertyClassifier>,
    validator: ConsistencyValidator,
    request_timeout: Duration,
}

impl ValidationPipeline {
    pub fn new(
        lookup: Arc<dyn PostalLookup>,
        classifier: Arc<dyn PropertyClassifier>,
        validator: ConsistencyValidator,
        request_timeout: Duration,
    ) -> Self {
        Self {
            lookup,
            classifier,
            validator,
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Validate one raw address within the request budget
    pub async fn validate(&self, raw: &str) -> Result<ValidationResult, PipelineError> {
        let deadline = Instant::now() + self.request_timeout;

        match tokio::time::timeout_at(deadline, self.run(raw, deadline)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let budget_ms = self.request_timeout.as_millis() as u64;
                warn!(budget_ms, "Validation request exceeded its budget");
                Err(PipelineError::Timeout { budget_ms })
            }
        }
    }

    /// Validate many addresses with at most `concurrency` in flight.
    /// Results come back in input order.
    pub async fn validate_batch<I, S>(
        &self,
        inputs: I,
        concurrency: usize,
    ) -> Vec<Result<ValidationResult, PipelineError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        stream::iter(inputs)
            .map(|raw| async move { self.validate(raw.as_ref()).await })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    async fn run(&self, raw: &str, deadline: Instant) -> Result<ValidationResult, PipelineError> {
        // Stage 1: normalize
        let parsed = normalize(raw);
        let mut issues = parsed.issues;

        // Stage 2: confirm postal code
        let postal_code = match postal_code_extractor::extract(&parsed.postal_candidate) {
            Ok(code) => code,
            Err(issue) => {
                debug!(code = %issue.code, "Postal code unusable, skipping lookup");
                issues.push(issue);
                return Ok(ValidationResult::new(issues, parsed.address, None, None));
            }
        };
        let address = parsed.address.with_postal_code(postal_code.clone());

        // Stage 3: canonical lookup
        let canonical = self.lookup.lookup(&postal_code, deadline).await?;

        // Stage 4: property type, only when it can change the outcome
        let property_type = match &canonical {
            Some(record) if ConsistencyValidator::needs_property_type(&address) => Some(
                self.classifier
                    .classify(&PropertyQuery::from_canonical(record), deadline)
                    .await,
            ),
            _ => None,
        };

        // Stage 5: cross-check
        let result = self
            .validator
            .validate(&address, canonical.as_ref(), property_type, issues);

        info!(
            postal_code = %postal_code,
            verdict = ?result.verdict(),
            issues = result.issues().len(),
            "Address validated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        FixtureClassifier, FixtureGeocoder, LabelTable, PostalLookupService, PropertyTypeResolver,
    };
    use crate::types::{CanonicalRecord, IssueCode, PostalCode, PropertyType, Verdict};
    use crate::utils::RetryPolicy;
    use sgav_common::config::ValidationConfig;

    fn pipeline(geocoder: FixtureGeocoder, classifier: FixtureClassifier) -> ValidationPipeline {
        ValidationPipeline::new(
            Arc::new(PostalLookupService::new(geocoder, RetryPolicy::no_retry())),
            Arc::new(PropertyTypeResolver::new(
                classifier,
                RetryPolicy::no_retry(),
                LabelTable::builtin(),
            )),
            ConsistencyValidator::from_config(&ValidationConfig::default()),
            Duration::from_secs(5),
        )
    }

    fn record(postal: &str, block: &str, street: &str) -> CanonicalRecord {
        CanonicalRecord {
            postal_code: PostalCode::parse(postal).unwrap(),
            canonical_block: Some(block.to_string()),
            canonical_street: street.to_string(),
            building_name: None,
        }
    }

    #[tokio::test]
    async fn test_missing_postal_skips_providers() {
        let p = pipeline(FixtureGeocoder::new(), FixtureClassifier::new());
        let result = p.validate("Blk 50 Commonwealth Drive").await.unwrap();
        assert_eq!(result.issue_codes(), vec![IssueCode::MissingPostalCode]);
        assert_eq!(result.verdict(), Verdict::Invalid);
    }

    #[tokio::test]
    async fn test_property_type_only_when_unit_missing() {
        let geocoder = FixtureGeocoder::new().with_record(record("560123", "123", "ANG MO KIO AVENUE 3"));
        let classifier = FixtureClassifier::new().with_label(Some("123"), "ANG MO KIO AVENUE 3", "HDB Blocks");
        let p = pipeline(geocoder, classifier);

        let with_unit = p.validate("Blk 123 Ang Mo Kio Ave 3 #12-345 560123").await.unwrap();
        assert_eq!(with_unit.verdict(), Verdict::Valid);
        assert_eq!(with_unit.property_type(), None);

        let without_unit = p.validate("Blk 123 Ang Mo Kio Ave 3 560123").await.unwrap();
        assert_eq!(without_unit.property_type(), Some(PropertyType::Hdb));
        assert_eq!(without_unit.issue_codes(), vec![IssueCode::MissingUnitNumber]);
    }

    #[tokio::test]
    async fn test_repaired_postal_code_used_for_lookup() {
        let geocoder = FixtureGeocoder::new().with_record(record("560123", "123", "ANG MO KIO AVENUE 3"));
        let p = pipeline(geocoder, FixtureClassifier::new());
        let result = p
            .validate("Blk 123 Ang Mo Kio Ave 3 #12-345 Singapore 560 123")
            .await
            .unwrap();
        assert_eq!(result.verdict(), Verdict::Valid);
        assert_eq!(
            result.normalized_address().postal_code.as_ref().map(PostalCode::as_str),
            Some("560123")
        );
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let geocoder = FixtureGeocoder::new()
            .with_record(record("560123", "123", "ANG MO KIO AVENUE 3"))
            .with_delay(Duration::from_millis(5));
        let p = pipeline(geocoder, FixtureClassifier::new());

        let results = p
            .validate_batch(["999999", "Blk 123 Ang Mo Kio Ave 3 #12-345 560123", "no postal"], 3)
            .await;
        let verdicts: Vec<_> = results.iter().map(|r| r.as_ref().unwrap().verdict()).collect();
        assert_eq!(verdicts, vec![Verdict::Invalid, Verdict::Valid, Verdict::Invalid]);
        assert!(results[0].as_ref().unwrap().has_issue(IssueCode::PostalCodeNotFound));
        assert!(results[2].as_ref().unwrap().has_issue(IssueCode::MissingPostalCode));
    }
}
