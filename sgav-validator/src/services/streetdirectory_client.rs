//! StreetDirectory Client
//!
//! Looks up premises category labels (`HDB Blocks`, `Condominium`, ...) on the
//! StreetDirectory search page.
//!
//! # Architecture
//! Implements `ClassificationSource`. The page has no API, so labels are read
//! from the `category_row` blocks of the result list. One HTTP call per query;
//! retry and caching live in `PropertyTypeResolver`.
//!
//! # Request
//! `GET <base_url>?q=<block street postal>&country=singapore&state=0`
//! with a browser User-Agent (the site refuses library defaults).

use crate::error::ProviderError;
use crate::types::{ClassificationSource, PropertyQuery};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{header, Client};
use sgav_common::config::ClassifierConfig;
use sgav_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

static CATEGORY_ROW_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div[^>]*class\s*=\s*["'][^"']*\bcategory_row\b[^"']*["'][^>]*>"#)
        .expect("static regex")
});

static DIV_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?div\b[^>]*>").expect("static regex"));

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

pub struct StreetDirectoryClient {
    http_client: Client,
    base_url: String,
    country: String,
}

impl StreetDirectoryClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let user_agent = header::HeaderValue::from_str(&config.user_agent)
            .map_err(|e| Error::Config(format!("Invalid classifier.user_agent: {}", e)))?;
        headers.insert(header::USER_AGENT, user_agent);

        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::Config(format!("Failed to create StreetDirectory HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
            country: config.country.clone(),
        })
    }
}

#[async_trait]
impl ClassificationSource for StreetDirectoryClient {
    fn name(&self) -> &'static str {
        "streetdirectory"
    }

    async fn categories(
        &self,
        query: &PropertyQuery,
    ) -> std::result::Result<Vec<String>, ProviderError> {
        let search_text = query.search_text();
        debug!(query = %search_text, "Querying StreetDirectory");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("q", search_text.as_str()),
                ("country", self.country.as_str()),
                ("state", "0"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        if let Some(err) = ProviderError::from_status(response.status()) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;
        let categories = extract_categories(&body);

        debug!(
            query = %search_text,
            categories = ?categories,
            "StreetDirectory query complete"
        );
        Ok(categories)
    }
}

/// Category labels from a search result page, in page order
///
/// Row text looks like `Category: HDB Blocks`; only the part after the
/// first `:` is kept.
pub fn extract_categories(html: &str) -> Vec<String> {
    CATEGORY_ROW_OPEN
        .find_iter(html)
        .filter_map(|open| {
            let body = row_body(&html[open.end()..]);
            let text = decode_entities(&TAG.replace_all(body, " "));
            let label = text.split_once(':').map_or(text.as_str(), |(_, rest)| rest);
            let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
            (!label.is_empty()).then_some(label)
        })
        .collect()
}

/// Markup up to the `</div>` closing the row, nested divs included
fn row_body(rest: &str) -> &str {
    let mut depth = 1usize;
    for tag in DIV_TAG.find_iter(rest) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return &rest[..tag.start()];
            }
        } else {
            depth += 1;
        }
    }
    rest
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
