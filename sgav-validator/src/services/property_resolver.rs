//! Property Type Resolver
//!
//! Maps classification labels onto the closed `PropertyType` set and wraps a
//! `ClassificationSource` with retry and a read-through cache keyed by the
//! (block, street) pair.
//!
//! # Label Mapping
//! Labels are matched case-insensitively against a fixed table. Labels that
//! describe something other than the premises (car parks, bomb shelters,
//! "Business dealing with ..." listings) are dropped first. The first
//! remaining label the table knows decides the type; none known means
//! `UNKNOWN`.
//!
//! # Failure Handling
//! Classification never fails the request: provider errors degrade to
//! `UNKNOWN` and are not cached, so a later request may still succeed.

use crate::error::ProviderError;
use crate::types::{ClassificationSource, PropertyClassifier, PropertyQuery, PropertyType};
use crate::utils::{ReadThroughCache, RetryError, RetryPolicy};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Category names that never describe the premises
const EXACT_EXCLUSIONS: &[&str] = &[
    "SCDF Bomb Shelter",
    "Multi Storey Car Park (MSCP)",
    "Car Park",
    "Fire Post",
];

/// Substrings marking a category as a business listing
const SUBSTRING_EXCLUSIONS: &[&str] = &["Business dealing with"];

/// Category label → property type table
#[derive(Debug, Clone)]
pub struct LabelTable {
    /// Lower-cased label → type
    labels: HashMap<String, PropertyType>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LabelTable {
    /// Built-in StreetDirectory label table
    pub fn builtin() -> Self {
        Self {
            labels: build_label_mappings(),
        }
    }

    /// Add or replace entries (later entries win)
    pub fn with_overrides<I, L>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (L, PropertyType)>,
        L: AsRef<str>,
    {
        for (label, property_type) in overrides {
            self.labels
                .insert(label.as_ref().trim().to_lowercase(), property_type);
        }
        self
    }

    pub fn lookup(&self, label: &str) -> Option<PropertyType> {
        self.labels.get(&label.trim().to_lowercase()).copied()
    }

    /// Decide the property type for a page's category list
    pub fn classify(&self, categories: &[String]) -> PropertyType {
        categories
            .iter()
            .filter(|category| !is_excluded(category))
            .find_map(|category| self.lookup(category))
            .unwrap_or(PropertyType::Unknown)
    }
}

/// True for categories that describe something other than the premises
pub fn is_excluded(category: &str) -> bool {
    let category = category.trim();
    EXACT_EXCLUSIONS
        .iter()
        .any(|excluded| category.eq_ignore_ascii_case(excluded))
        || SUBSTRING_EXCLUSIONS.iter().any(|fragment| {
            category
                .to_lowercase()
                .contains(&fragment.to_lowercase())
        })
}

/// Build the built-in label mappings
fn build_label_mappings() -> HashMap<String, PropertyType> {
    let mut mappings = HashMap::new();

    // Public housing
    for label in ["HDB Blocks", "DBSS Blocks", "HUDC Estate"] {
        mappings.insert(label.to_lowercase(), PropertyType::Hdb);
    }

    // Private strata residential
    for label in [
        "Condominium",
        "Executive Condominium",
        "Apartments",
        "Serviced Apartments",
    ] {
        mappings.insert(label.to_lowercase(), PropertyType::Condominium);
    }

    // Landed, addressed by house number alone
    for label in [
        "Bungalow",
        "Good Class Bungalow",
        "Semi Detached House",
        "Terrace House",
        "Cluster House",
        "Shop Houses",
    ] {
        mappings.insert(label.to_lowercase(), PropertyType::Landed);
    }

    // Commercial and industrial strata
    for label in [
        "Commercial Building",
        "Office Building",
        "Industrial Building",
        "Industrial Estate",
        "Shopping Malls",
        "Dormitory",
    ] {
        mappings.insert(label.to_lowercase(), PropertyType::Commercial);
    }

    // Institutions: unit requirement cannot be decided from the category
    for label in [
        "International School",
        "Primary School",
        "Kindergarten",
        "Preschool",
        "Hospital",
        "Church",
        "Methodist Church",
        "Bank Branches",
        "Supermarket",
        "Public Building",
    ] {
        mappings.insert(label.to_lowercase(), PropertyType::Unknown);
    }

    mappings
}

/// Resolver combining a classification source, retry, cache and label table
pub struct PropertyTypeResolver<S> {
    source: S,
    policy: RetryPolicy,
    labels: LabelTable,
    cache: ReadThroughCache<(String, String), PropertyType, RetryError<ProviderError>>,
}

impl<S: ClassificationSource> PropertyTypeResolver<S> {
    pub fn new(source: S, policy: RetryPolicy, labels: LabelTable) -> Self {
        Self {
            source,
            policy,
            labels,
            cache: ReadThroughCache::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl<S: ClassificationSource> PropertyClassifier for PropertyTypeResolver<S> {
    async fn classify(&self, query: &PropertyQuery, deadline: Instant) -> PropertyType {
        let key = query.cache_key();
        let outcome = self
            .cache
            .get_or_try_load(&key, || async {
                let categories = self
                    .policy
                    .run("property classification", Some(deadline), || {
                        self.source.categories(query)
                    })
                    .await?;
                let property_type = self.labels.classify(&categories);
                debug!(
                    block = %key.0,
                    street = %key.1,
                    categories = ?categories,
                    property_type = %property_type,
                    "Classified property"
                );
                Ok::<_, RetryError<ProviderError>>(property_type)
            })
            .await;

        match outcome {
            Ok(property_type) => property_type,
            Err(err) => {
                warn!(
                    provider = self.source.name(),
                    block = %key.0,
                    street = %key.1,
                    attempts = err.attempts,
                    error = %err.error,
                    "Property classification unavailable, using UNKNOWN"
                );
                PropertyType::Unknown
            }
        }
    }
}
