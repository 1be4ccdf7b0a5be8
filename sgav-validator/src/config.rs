//! Configuration resolution for sgav-validator
//!
//! Turns a loaded `TomlConfig` into a ready pipeline, live or fixture-backed.
//!
//! OneMap token resolution priority: ENV (`SGAV_ONEMAP_TOKEN`) → TOML
//! (`geocoder.api_token`) → none (anonymous requests).

use crate::services::{
    FixtureData, LabelTable, OneMapClient, PostalLookupService, PropertyTypeResolver,
    StreetDirectoryClient,
};
use crate::types::PropertyType;
use crate::utils::RetryPolicy;
use crate::validators::ConsistencyValidator;
use crate::workflow::ValidationPipeline;
use sgav_common::config::TomlConfig;
use sgav_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable carrying the OneMap API token
pub const ONEMAP_TOKEN_ENV_VAR: &str = "SGAV_ONEMAP_TOKEN";

/// Resolve the OneMap API token
///
/// **Priority:** ENV → TOML. Blank values are ignored.
pub fn resolve_onemap_token(toml_config: &TomlConfig) -> Option<String> {
    let env_token = std::env::var(ONEMAP_TOKEN_ENV_VAR)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .geocoder
        .api_token
        .clone()
        .filter(|t| is_valid_token(t));

    match (env_token, toml_token) {
        (Some(env), Some(_)) => {
            warn!(
                "OneMap token found in both environment and TOML config. Using environment (highest priority)."
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("OneMap token loaded from environment variable");
            Some(env)
        }
        (None, Some(toml)) => {
            info!("OneMap token loaded from TOML config");
            Some(toml)
        }
        (None, None) => {
            info!("No OneMap token configured, using anonymous requests");
            None
        }
    }
}

/// Token must be non-empty and non-whitespace
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}

/// Built-in label table with `validation.property_labels` merged over it
pub fn label_table(toml_config: &TomlConfig) -> Result<LabelTable> {
    let overrides = toml_config
        .validation
        .property_labels
        .iter()
        .map(|(label, type_name)| {
            type_name
                .parse::<PropertyType>()
                .map(|property_type| (label.clone(), property_type))
                .map_err(|e| {
                    Error::Config(format!("validation.property_labels.{:?}: {}", label, e))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LabelTable::builtin().with_overrides(overrides))
}

/// Pipeline backed by the live OneMap and StreetDirectory providers
pub fn build_live_pipeline(toml_config: &TomlConfig) -> Result<ValidationPipeline> {
    let policy = RetryPolicy::from_config(&toml_config.retry);
    let geocoder = OneMapClient::new(&toml_config.geocoder, resolve_onemap_token(toml_config))?;
    let classifier = StreetDirectoryClient::new(&toml_config.classifier)?;

    Ok(ValidationPipeline::new(
        Arc::new(PostalLookupService::new(geocoder, policy)),
        Arc::new(PropertyTypeResolver::new(
            classifier,
            policy,
            label_table(toml_config)?,
        )),
        ConsistencyValidator::from_config(&toml_config.validation),
        Duration::from_millis(toml_config.validation.request_timeout_ms),
    ))
}

/// Pipeline backed by in-memory fixture data
pub fn build_fixture_pipeline(
    toml_config: &TomlConfig,
    data: FixtureData,
) -> Result<ValidationPipeline> {
    let policy = RetryPolicy::from_config(&toml_config.retry);
    let (geocoder, classifier) = data.into_sources();

    Ok(ValidationPipeline::new(
        Arc::new(PostalLookupService::new(geocoder, policy)),
        Arc::new(PropertyTypeResolver::new(
            classifier,
            policy,
            label_table(toml_config)?,
        )),
        ConsistencyValidator::from_config(&toml_config.validation),
        Duration::from_millis(toml_config.validation.request_timeout_ms),
    ))
}
