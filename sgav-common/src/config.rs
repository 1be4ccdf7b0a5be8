//! Configuration loading and config-file resolution
//!
//! Bootstrap configuration lives in a single TOML file. Every section and
//! every field is optional; anything missing falls back to compiled defaults.
//!
//! # Config File Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`SGAV_CONFIG`)
//! 3. Platform config directory (`~/.config/sgav/config.toml` on Linux)
//! 4. Compiled defaults (no file)
//!
//! A missing file is never fatal: it is logged and defaults are used. A file
//! that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SGAV_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Postal-code geocoding provider (OneMap)
    pub geocoder: GeocoderConfig,
    /// Property classification source (StreetDirectory)
    pub classifier: ClassifierConfig,
    /// Retry policy shared by both external providers
    pub retry: RetryConfig,
    /// Validation rules
    pub validation: ValidationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Geocoding provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Search endpoint
    pub base_url: String,
    /// Bearer token, sent as `Authorization` when present
    pub api_token: Option<String>,
    /// Per-call HTTP timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.onemap.gov.sg/api/common/elastic/search".to_string(),
            api_token: None,
            timeout_ms: 5_000,
        }
    }
}

/// Property classification source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Search page URL
    pub base_url: String,
    /// Country parameter sent with each query
    pub country: String,
    /// Per-call HTTP timeout in milliseconds
    pub timeout_ms: u64,
    /// User-Agent header (the site rejects library defaults)
    pub user_agent: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.streetdirectory.com/asia_travel/search/".to_string(),
            country: "singapore".to_string(),
            timeout_ms: 10_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per external call (first try included)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt
    pub base_delay_ms: u64,
    /// Ceiling for a single backoff delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Validation rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Overall budget for one validation request in milliseconds
    pub request_timeout_ms: u64,
    /// Minimum street similarity (0.0-1.0) to accept a street as matching
    pub street_similarity_threshold: f64,
    /// Drop one trailing letter from both blocks before comparing (`113A` == `113`)
    pub strip_block_suffix: bool,
    /// Street token abbreviations, lower-case token → expansion.
    /// Replaces the built-in table when given.
    pub street_abbreviations: BTreeMap<String, String>,
    /// Extra classification labels → property type name
    /// (`HDB`, `CONDOMINIUM`, `LANDED`, `COMMERCIAL`, `UNKNOWN`),
    /// merged over the built-in label table.
    pub property_labels: BTreeMap<String, String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            street_similarity_threshold: 0.85,
            strip_block_suffix: false,
            street_abbreviations: default_street_abbreviations(),
            property_labels: BTreeMap::new(),
        }
    }
}

/// Built-in street abbreviation table
pub fn default_street_abbreviations() -> BTreeMap<String, String> {
    [
        ("st", "street"),
        ("ave", "avenue"),
        ("av", "avenue"),
        ("rd", "road"),
        ("dr", "drive"),
        ("ln", "lane"),
        ("cres", "crescent"),
        ("cresc", "crescent"),
        ("blvd", "boulevard"),
        ("pl", "place"),
        ("cl", "close"),
        ("ter", "terrace"),
        ("terr", "terrace"),
        ("ctrl", "central"),
        ("nth", "north"),
        ("sth", "south"),
        ("upp", "upper"),
        ("jln", "jalan"),
        ("lor", "lorong"),
        ("bt", "bukit"),
        ("tg", "tanjong"),
        ("kg", "kampong"),
        ("pk", "park"),
        ("gdn", "garden"),
        ("gdns", "gardens"),
        ("hts", "heights"),
        ("ind", "industrial"),
        ("ctr", "centre"),
        ("sq", "square"),
        ("expy", "expressway"),
        ("hwy", "highway"),
        ("mt", "mount"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl TomlConfig {
    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.validation.street_similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "validation.street_similarity_threshold must be within 0.0-1.0, got {}",
                threshold
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(Error::Config(format!(
                "retry.max_delay_ms ({}) is below retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if self.validation.request_timeout_ms == 0 {
            return Err(Error::Config(
                "validation.request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sgav").join("config.toml"))
}

/// Config file resolution following the priority order in the module docs
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Pick the config file path, if any tier names one
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory (only if the file is there)
        default_config_path().filter(|p| p.exists())
    }

    /// Load the resolved config, falling back to defaults when no file exists
    pub fn load(&self) -> Result<TomlConfig> {
        let Some(path) = self.resolve_path() else {
            info!("No config file found, using compiled defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} does not exist, using compiled defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }

        let config = load_toml_config(&path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Write config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.validation.street_similarity_threshold, 0.85);
        assert_eq!(
            config.validation.street_abbreviations.get("ave").map(String::as_str),
            Some("avenue")
        );
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.geocoder, GeocoderConfig::default());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = TomlConfig::default();
        config.validation.street_similarity_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = TomlConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
