//! OneMap Client
//!
//! Queries the OneMap elastic search endpoint for a postal code.
//!
//! # Architecture
//! Implements `GeocodingSource`: one HTTP call per `search`, no retry and no
//! caching (both live in `PostalLookupService`).
//!
//! # API Reference
//! - Endpoint: https://www.onemap.gov.sg/api/common/elastic/search
//! - Query: `searchVal=<postal>&returnGeom=N&getAddrDetails=Y&pageNum=1`
//! - Result fields used: `BLK_NO`, `ROAD_NAME`, `BUILDING`, `POSTAL`

use crate::error::ProviderError;
use crate::types::{GeocodeHit, GeocodingSource, PostalCode};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use sgav_common::config::GeocoderConfig;
use sgav_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// OneMap Client
///
/// Sends the API token as a bearer token when one is configured. The search
/// endpoint answers anonymous requests as well.
pub struct OneMapClient {
    http_client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl OneMapClient {
    /// Create client from geocoder configuration and a resolved token
    pub fn new(config: &GeocoderConfig, api_token: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create OneMap HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            api_token,
        })
    }

    async fn query(&self, postal_code: &PostalCode) -> std::result::Result<String, ProviderError> {
        let mut request = self.http_client.get(&self.base_url).query(&[
            ("searchVal", postal_code.as_str()),
            ("returnGeom", "N"),
            ("getAddrDetails", "Y"),
            ("pageNum", "1"),
        ]);
        if let Some(token) = &self.api_token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if let Some(err) = ProviderError::from_status(response.status()) {
            debug!(postal = %postal_code, status = %response.status(), "OneMap returned error status");
            return Err(err);
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e))
    }
}

#[async_trait]
impl GeocodingSource for OneMapClient {
    fn name(&self) -> &'static str {
        "onemap"
    }

    async fn search(
        &self,
        postal_code: &PostalCode,
    ) -> std::result::Result<Vec<GeocodeHit>, ProviderError> {
        debug!(postal = %postal_code, "Querying OneMap");

        let body = self.query(postal_code).await?;
        let hits = parse_search_response(&body)?;

        debug!(postal = %postal_code, hits = hits.len(), "OneMap query complete");
        Ok(hits)
    }
}

/// Parse a search response body into hits
///
/// `NIL` and empty strings are treated as absent values.
pub fn parse_search_response(body: &str) -> std::result::Result<Vec<GeocodeHit>, ProviderError> {
    let response: OneMapResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("Failed to parse OneMap response: {}", e))
    })?;

    let results = response.results.ok_or_else(|| {
        ProviderError::InvalidResponse("OneMap response has no results field".to_string())
    })?;

    Ok(results
        .into_iter()
        .map(|r| GeocodeHit {
            postal: r.postal.trim().to_string(),
            block: present(r.blk_no),
            street: present(r.road_name).unwrap_or_default(),
            building: present(r.building),
        })
        .collect())
}

fn present(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("NIL") {
        None
    } else {
        Some(value.to_string())
    }
}

// ============================================================================
// OneMap API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OneMapResponse {
    results: Option<Vec<OneMapResult>>,
}

#[derive(Debug, Deserialize)]
struct OneMapResult {
    #[serde(rename = "BLK_NO", default)]
    blk_no: String,
    #[serde(rename = "ROAD_NAME", default)]
    road_name: String,
    #[serde(rename = "BUILDING", default)]
    building: String,
    #[serde(rename = "POSTAL", default)]
    postal: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_name() {
        let client = OneMapClient::new(&GeocoderConfig::default(), None).unwrap();
        assert_eq!(client.name(), "onemap");
    }

    #[test]
    fn test_parse_results() {
        let body = r#"{
            "found": 2, "totalNumPages": 1, "pageNum": 1,
            "results": [
                {"SEARCHVAL": "ORCHARD TOWERS", "BLK_NO": "400", "ROAD_NAME": "ORCHARD ROAD",
                 "BUILDING": "ORCHARD TOWERS", "ADDRESS": "400 ORCHARD ROAD ORCHARD TOWERS SINGAPORE 238875",
                 "POSTAL": "238875"},
                {"SEARCHVAL": "JALAN KAYU", "BLK_NO": "NIL", "ROAD_NAME": "JALAN KAYU",
                 "BUILDING": "NIL", "POSTAL": "799999"}
            ]
        }"#;
        let hits = parse_search_response(body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].block.as_deref(), Some("400"));
        assert_eq!(hits[0].street, "ORCHARD ROAD");
        assert_eq!(hits[0].building.as_deref(), Some("ORCHARD TOWERS"));
        assert_eq!(hits[1].block, None);
        assert_eq!(hits[1].building, None);
    }

    #[test]
    fn test_parse_empty_results() {
        let hits = parse_search_response(r#"{"found": 0, "results": []}"#).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_parse_invalid_body() {
        assert!(matches!(
            parse_search_response("<html>busy</html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_search_response(r#"{"error": "Invalid token"}"#),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
