//! Provider services
//!
//! # Sources (one call, no retry)
//! - **onemap_client** - postal code → canonical address (`GeocodingSource`)
//! - **streetdirectory_client** - block/street → category labels (`ClassificationSource`)
//! - **fixtures** - in-memory variants of both for offline runs and tests
//!
//! # Services (retry + cache)
//! - **postal_lookup** - `PostalLookup` over any `GeocodingSource`
//! - **property_resolver** - `PropertyClassifier` over any `ClassificationSource`

pub mod fixtures;
pub mod onemap_client;
pub mod postal_lookup;
pub mod property_resolver;
pub mod streetdirectory_client;

pub use fixtures::{FixtureClassifier, FixtureData, FixtureGeocoder, FixtureProperty};
pub use onemap_client::OneMapClient;
pub use postal_lookup::PostalLookupService;
pub use property_resolver::{LabelTable, PropertyTypeResolver};
pub use streetdirectory_client::StreetDirectoryClient;
