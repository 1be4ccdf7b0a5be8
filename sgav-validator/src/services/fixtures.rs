//! Fixture-backed providers
//!
//! In-memory `GeocodingSource` and `ClassificationSource` implementations for
//! offline runs (`--fixtures <file.json>`) and tests. Both count calls and can
//! be scripted to fail or respond slowly.
//!
//! # Fixture file format
//! ```json
//! {
//!   "records": [
//!     {"postal_code": "560123", "canonical_block": "123",
//!      "canonical_street": "ANG MO KIO AVENUE 3", "building_name": null}
//!   ],
//!   "properties": [
//!     {"block": "123", "street": "ANG MO KIO AVENUE 3", "categories": ["HDB Blocks"]}
//!   ]
//! }
//! ```

use crate::error::ProviderError;
use crate::types::{
    CanonicalRecord, ClassificationSource, GeocodeHit, GeocodingSource, PostalCode, PropertyQuery,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sgav_common::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Offline provider data loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub records: Vec<CanonicalRecord>,
    #[serde(default)]
    pub properties: Vec<FixtureProperty>,
}

/// Classification labels for one (block, street) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureProperty {
    #[serde(default)]
    pub block: Option<String>,
    pub street: String,
    pub categories: Vec<String>,
}

impl FixtureData {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read fixtures {} failed: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Parse fixtures {} failed: {}", path.display(), e))
        })
    }

    /// Split into a geocoder and a classifier sharing nothing
    pub fn into_sources(self) -> (FixtureGeocoder, FixtureClassifier) {
        let geocoder = self
            .records
            .into_iter()
            .fold(FixtureGeocoder::new(), FixtureGeocoder::with_record);
        let classifier = self
            .properties
            .into_iter()
            .fold(FixtureClassifier::new(), |classifier, p| {
                classifier.with_categories(p.block.as_deref(), &p.street, p.categories)
            });
        (geocoder, classifier)
    }
}

/// Scripted failures and latency shared by both fixture sources
#[derive(Default)]
struct Script {
    calls: AtomicUsize,
    queued_failures: Mutex<VecDeque<ProviderError>>,
    persistent_failure: Option<ProviderError>,
    delay: Duration,
}

impl Script {
    /// Count the call, wait out the delay, and return the scripted failure if any
    async fn begin_call(&self) -> std::result::Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let queued = self
            .queued_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match queued.or_else(|| self.persistent_failure.clone()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn queue(&mut self, times: usize, err: ProviderError) {
        let queue = self
            .queued_failures
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        queue.extend(std::iter::repeat(err).take(times));
    }
}

/// Geocoder answering from an in-memory postal table
#[derive(Default)]
pub struct FixtureGeocoder {
    hits: HashMap<String, Vec<GeocodeHit>>,
    script: Script,
}

impl FixtureGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: CanonicalRecord) -> Self {
        let hit = GeocodeHit {
            postal: record.postal_code.to_string(),
            block: record.canonical_block,
            street: record.canonical_street,
            building: record.building_name,
        };
        self.hits
            .entry(record.postal_code.to_string())
            .or_default()
            .push(hit);
        self
    }

    /// Raw hit list returned for a searched postal code
    pub fn with_hits(mut self, postal_code: &str, hits: Vec<GeocodeHit>) -> Self {
        self.hits.insert(postal_code.to_string(), hits);
        self
    }

    /// Fail the next `times` calls with `err`
    pub fn fail_times(mut self, times: usize, err: ProviderError) -> Self {
        self.script.queue(times, err);
        self
    }

    /// Fail every call (after queued failures) with `err`
    pub fn fail_always(mut self, err: ProviderError) -> Self {
        self.script.persistent_failure = Some(err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingSource for FixtureGeocoder {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn search(
        &self,
        postal_code: &PostalCode,
    ) -> std::result::Result<Vec<GeocodeHit>, ProviderError> {
        self.script.begin_call().await?;
        Ok(self
            .hits
            .get(postal_code.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

/// Classifier answering from an in-memory (block, street) table
#[derive(Default)]
pub struct FixtureClassifier {
    categories: HashMap<(String, String), Vec<String>>,
    script: Script,
}

impl FixtureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(
        mut self,
        block: Option<&str>,
        street: &str,
        categories: Vec<String>,
    ) -> Self {
        let key = PropertyQuery {
            block: block.map(str::to_string),
            street: Some(street.to_string()),
            postal_code: None,
        }
        .cache_key();
        self.categories.insert(key, categories);
        self
    }

    /// Single-label shorthand
    pub fn with_label(self, block: Option<&str>, street: &str, label: &str) -> Self {
        self.with_categories(block, street, vec![label.to_string()])
    }

    pub fn fail_times(mut self, times: usize, err: ProviderError) -> Self {
        self.script.queue(times, err);
        self
    }

    pub fn fail_always(mut self, err: ProviderError) -> Self {
        self.script.persistent_failure = Some(err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationSource for FixtureClassifier {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn categories(
        &self,
        query: &PropertyQuery,
    ) -> std::result::Result<Vec<String>, ProviderError> {
        self.script.begin_call().await?;
        Ok(self
            .categories
            .get(&query.cache_key())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let geocoder = FixtureGeocoder::new()
            .with_hits("560123", vec![])
            .fail_times(2, ProviderError::Server(503));
        let code = PostalCode::parse("560123").unwrap();

        assert_eq!(geocoder.search(&code).await, Err(ProviderError::Server(503)));
        assert_eq!(geocoder.search(&code).await, Err(ProviderError::Server(503)));
        assert_eq!(geocoder.search(&code).await, Ok(vec![]));
        assert_eq!(geocoder.calls(), 3);
    }

    #[tokio::test]
    async fn test_classifier_key_ignores_case() {
        let classifier = FixtureClassifier::new().with_label(Some("123"), "Ang Mo Kio Avenue 3", "HDB Blocks");
        let query = PropertyQuery {
            block: Some("123".into()),
            street: Some("ANG MO KIO AVENUE 3".into()),
            postal_code: None,
        };
        assert_eq!(classifier.categories(&query).await.unwrap(), vec!["HDB Blocks"]);
    }

    #[test]
    fn test_load_fixture_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "records": [
                    {{"postal_code": "560123", "canonical_block": "123",
                      "canonical_street": "ANG MO KIO AVENUE 3"}}
                ],
                "properties": [
                    {{"block": "123", "street": "ANG MO KIO AVENUE 3", "categories": ["HDB Blocks"]}}
                ]
            }}"#
        )
        .unwrap();

        let data = FixtureData::load(file.path()).unwrap();
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.records[0].building_name, None);
        assert_eq!(data.properties[0].categories, vec!["HDB Blocks"]);
    }

    #[test]
    fn test_load_rejects_bad_postal_code() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"records": [{{"postal_code": "5601", "canonical_street": "X ROAD"}}]}}"#
        )
        .unwrap();
        assert!(matches!(FixtureData::load(file.path()), Err(Error::Config(_))));
    }
}
