//! Shared fixtures for integration tests
#![allow(dead_code)]

use sgav_common::config::ValidationConfig;
use sgav_validator::services::{
    FixtureClassifier, FixtureGeocoder, LabelTable, PostalLookupService, PropertyTypeResolver,
};
use sgav_validator::types::{PostalLookup, PropertyClassifier};
use sgav_validator::utils::RetryPolicy;
use sgav_validator::validators::ConsistencyValidator;
use sgav_validator::{CanonicalRecord, PostalCode, ValidationPipeline};
use std::sync::Arc;
use std::time::Duration;

/// Pipeline plus handles on its fixture providers
pub struct Harness {
    pub pipeline: Arc<ValidationPipeline>,
    pub lookup: Arc<PostalLookupService<FixtureGeocoder>>,
    pub resolver: Arc<PropertyTypeResolver<FixtureClassifier>>,
}

impl Harness {
    pub fn geocoder_calls(&self) -> usize {
        self.lookup.source().calls()
    }

    pub fn classifier_calls(&self) -> usize {
        self.resolver.source().calls()
    }
}

pub fn record(postal: &str, block: Option<&str>, street: &str) -> CanonicalRecord {
    CanonicalRecord {
        postal_code: PostalCode::parse(postal).expect("valid postal code in test data"),
        canonical_block: block.map(str::to_string),
        canonical_street: street.to_string(),
        building_name: None,
    }
}

/// Retry policy with millisecond backoff
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
}

pub fn harness(geocoder: FixtureGeocoder, classifier: FixtureClassifier) -> Harness {
    harness_with(
        geocoder,
        classifier,
        fast_retry(5),
        Duration::from_secs(5),
        &ValidationConfig::default(),
    )
}

pub fn harness_with(
    geocoder: FixtureGeocoder,
    classifier: FixtureClassifier,
    policy: RetryPolicy,
    request_timeout: Duration,
    validation: &ValidationConfig,
) -> Harness {
    let lookup = Arc::new(PostalLookupService::new(geocoder, policy));
    let resolver = Arc::new(PropertyTypeResolver::new(
        classifier,
        policy,
        LabelTable::builtin(),
    ));

    let lookup_dyn: Arc<dyn PostalLookup> = lookup.clone();
    let resolver_dyn: Arc<dyn PropertyClassifier> = resolver.clone();
    let pipeline = Arc::new(ValidationPipeline::new(
        lookup_dyn,
        resolver_dyn,
        ConsistencyValidator::from_config(validation),
        request_timeout,
    ));

    Harness {
        pipeline,
        lookup,
        resolver,
    }
}

/// Canonical records with the classification label each one carries
pub fn known_premises() -> Vec<(CanonicalRecord, &'static str)> {
    vec![
        (record("560123", Some("123"), "ANG MO KIO AVENUE 3"), "HDB Blocks"),
        (record("238839", Some("238"), "ORCHARD ROAD"), "Shopping Malls"),
        (record("605288", Some("288E"), "JURONG EAST STREET 21"), "HDB Blocks"),
        (record("248420", Some("26"), "RIDOUT ROAD"), "Bungalow"),
        (record("018956", Some("10"), "BAYFRONT AVENUE"), "Commercial Building"),
        (record("799999", None, "JALAN KAYU"), "Terrace House"),
        (record("469001", Some("1"), "BEDOK NORTH AVENUE 1"), "Condominium"),
    ]
}

pub fn standard_geocoder() -> FixtureGeocoder {
    known_premises()
        .into_iter()
        .fold(FixtureGeocoder::new(), |g, (rec, _)| g.with_record(rec))
}

pub fn standard_classifier() -> FixtureClassifier {
    known_premises()
        .into_iter()
        .fold(FixtureClassifier::new(), |c, (rec, label)| {
            c.with_label(rec.canonical_block.as_deref(), &rec.canonical_street, label)
        })
}

pub fn standard_harness() -> Harness {
    harness(standard_geocoder(), standard_classifier())
}
