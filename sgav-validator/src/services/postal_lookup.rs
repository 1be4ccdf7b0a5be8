//! Postal Lookup Service
//!
//! Wraps a `GeocodingSource` with the shared retry policy and a read-through
//! cache keyed by postal code, and reduces the provider's hit list to one
//! `CanonicalRecord`.
//!
//! # Outcomes
//! - Hits with a matching postal code → `Some(record)` (cached)
//! - No matching hit, or request rejected → `None` (cached)
//! - Transient failures past the retry budget → `LookupError` (not cached)

use crate::error::{LookupError, ProviderError};
use crate::types::{CanonicalRecord, GeocodeHit, GeocodingSource, PostalCode, PostalLookup};
use crate::utils::{ReadThroughCache, RetryError, RetryPolicy};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::warn;

pub struct PostalLookupService<S> {
    source: S,
    policy: RetryPolicy,
    cache: ReadThroughCache<PostalCode, Option<CanonicalRecord>, LookupError>,
}

impl<S: GeocodingSource> PostalLookupService<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            cache: ReadThroughCache::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of postal codes with a memoized answer
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(
        &self,
        postal_code: &PostalCode,
        deadline: Instant,
    ) -> Result<Option<CanonicalRecord>, LookupError> {
        let outcome = self
            .policy
            .run("postal lookup", Some(deadline), || self.source.search(postal_code))
            .await;

        match outcome {
            Ok(hits) => Ok(select_record(postal_code, hits)),
            Err(RetryError {
                error: ProviderError::Rejected(status),
                ..
            }) => {
                warn!(
                    provider = self.source.name(),
                    postal = %postal_code,
                    status,
                    "Lookup rejected by provider, treating postal code as not found"
                );
                Ok(None)
            }
            Err(err) => Err(LookupError {
                provider: self.source.name(),
                attempts: err.attempts,
                source: err.error,
            }),
        }
    }
}

#[async_trait]
impl<S: GeocodingSource> PostalLookup for PostalLookupService<S> {
    async fn lookup(
        &self,
        postal_code: &PostalCode,
        deadline: Instant,
    ) -> Result<Option<CanonicalRecord>, LookupError> {
        self.cache
            .get_or_try_load(postal_code, || self.fetch(postal_code, deadline))
            .await
    }
}

/// Pick the record for `postal_code` out of a provider hit list
///
/// Only hits whose postal code equals the query count. When several match,
/// the first wins.
pub fn select_record(postal_code: &PostalCode, hits: Vec<GeocodeHit>) -> Option<CanonicalRecord> {
    let mut matching = hits
        .into_iter()
        .filter(|hit| hit.postal == postal_code.as_str());

    let first = matching.next()?;
    let others = matching.count();
    if others > 0 {
        warn!(
            postal = %postal_code,
            extra_matches = others,
            "Multiple results for postal code, using the first"
        );
    }

    Some(CanonicalRecord {
        postal_code: postal_code.clone(),
        canonical_block: first.block,
        canonical_street: first.street,
        building_name: first.building,
    })
}
