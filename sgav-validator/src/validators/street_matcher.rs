//! Street Name Matcher
//!
//! Tolerant street comparison: `Ang Mo Kio Ave 3` matches `ANG MO KIO AVENUE 3`.
//!
//! # Scoring Algorithm
//! 1. Lower-case, replace punctuation with spaces
//! 2. Expand abbreviated tokens (`ave` → `avenue`)
//! 3. Score = max(normalized Levenshtein of the joined token strings,
//!    normalized Levenshtein of the alphabetically sorted token strings)
//!
//! The sorted comparison absorbs reordered tokens (`Street 21 Jurong East`).
//! Tokens containing digits must agree exactly, otherwise the score is 0.0:
//! `Avenue 3` and `Avenue 10` are different streets however close the text.

use std::collections::{BTreeMap, HashMap};

pub struct StreetMatcher {
    abbreviations: HashMap<String, String>,
    threshold: f64,
}

impl StreetMatcher {
    pub fn new(abbreviations: &BTreeMap<String, String>, threshold: f64) -> Self {
        Self {
            abbreviations: abbreviations
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                .collect(),
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Comparison tokens for a street name
    pub fn tokens(&self, street: &str) -> Vec<String> {
        street
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| {
                self.abbreviations
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| t.to_string())
            })
            .collect()
    }

    /// Similarity in 0.0-1.0
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let mut tokens_a = self.tokens(a);
        let mut tokens_b = self.tokens(b);

        if numbered_tokens(&tokens_a) != numbered_tokens(&tokens_b) {
            return 0.0;
        }

        let joined = strsim::normalized_levenshtein(&tokens_a.join(" "), &tokens_b.join(" "));

        tokens_a.sort();
        tokens_b.sort();
        let sorted = strsim::normalized_levenshtein(&tokens_a.join(" "), &tokens_b.join(" "));

        joined.max(sorted)
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.similarity(a, b) >= self.threshold
    }
}

fn numbered_tokens(tokens: &[String]) -> Vec<&str> {
    let mut numbered: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .collect();
    numbered.sort_unstable();
    numbered
}
