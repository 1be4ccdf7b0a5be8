//! Address Normalizer
//!
//! Splits free-form Singapore address text into candidate components.
//! Pure and deterministic: no I/O, no configuration, same input same output.
//!
//! # Extraction Order
//! 1. **Postal code**: last run of exactly six digits, with an optional
//!    `Singapore` / `S` / `S(...)` prefix. Without one, a separator-split or
//!    wrong-length trailing run is kept as a malformed candidate.
//! 2. **Unit**: `#`-prefixed designator, or a bare `12-34` dash form
//! 3. **Block**: `Blk`/`Block`/`Apt` prefix, else a leading house number
//! 4. **Street / building**: remaining comma segments
//!
//! Each step consumes its span of text, so no character is assigned to two
//! components.

use crate::types::{AddressField, IssueCode, NormalizedAddress, PostalCode, ValidationIssue};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::ops::Range;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("static regex"));

/// `Singapore`, `SG` or `S` immediately before a postal code, optional `(`
static POSTAL_PREFIX_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:singapore|sg)\s*|\bs\s*)\(?\s*$").expect("static regex")
});

static CLOSING_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\)").expect("static regex"));

/// Prefixed postal candidate that is not a clean six-digit run (`S 560 123`)
static PREFIXED_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bsingapore|\bsg|\bs)\s*\(?\s*([0-9](?:[0-9 \-]*[0-9])?)\s*\)?")
        .expect("static regex")
});

/// Unit numbers introduced by `#` or `unit`, never postal code candidates
static MARKED_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:#|\bunit\b)\s*[A-Z0-9]+(?:\s*[-/]\s*[A-Z0-9]+)*").expect("static regex")
});

/// Two digit groups split by a space or dash (`560 123`, `560-123`)
static SPLIT_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]{2,4}[ \-][0-9]{2,4}\b").expect("static regex"));

/// Anything unit-shaped, used when deciding whether text trails the postal code
static UNIT_ANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#\s*[A-Z0-9]+(?:\s*[-/]\s*[A-Z0-9]+)*|\b[0-9]{1,3}\s*-\s*[0-9]{1,5}[A-Z]?\b")
        .expect("static regex")
});

static COUNTRY_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:republic\s+of\s+)?singapore\b|\bsg\b").expect("static regex")
});

static COUNTRY_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:republic\s+of\s+)?singapore$|^sg$").expect("static regex")
});

static TRAILING_COUNTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+singapore$").expect("static regex"));

static UNIT_HASH_STRICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bunit\s*)?#\s*(B?[0-9]{1,3})\s*-\s*([0-9]{1,5}[A-Z]?)\b")
        .expect("static regex")
});

static UNIT_HASH_LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bunit\s*)?#\s*([A-Z0-9]+(?:\s*[-/]\s*[A-Z0-9]+)*)").expect("static regex")
});

static UNIT_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bunit\s*)?\b([0-9]{1,3})\s*-\s*([0-9]{1,5}[A-Z]?)\b").expect("static regex")
});

static BLOCK_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:blk|block|bk|apt|apartment)$").expect("static regex"));

static BLOCK_PREFIX_JOINED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:blk|block)([0-9]{1,4}[A-Z]?)$").expect("static regex"));

static BLOCK_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9]{1,4}[A-Z]?$").expect("static regex"));

/// Words that mark a segment as a street name
static STREET_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "street", "st", "road", "rd", "avenue", "ave", "av", "drive", "dr", "lane", "ln",
        "crescent", "cres", "boulevard", "blvd", "walk", "way", "place", "pl", "close", "cl",
        "terrace", "ter", "rise", "link", "loop", "view", "central", "ctrl", "circle",
        "circuit", "highway", "expressway", "quay", "jalan", "jln", "lorong", "lor", "sector",
        "grove", "vale", "ring", "bypass",
    ]
    .into_iter()
    .collect()
});

/// Postal code candidate as found in the text, before repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostalCandidate {
    Absent,
    Found(String),
}

/// Normalizer output: the candidate address plus extraction-time findings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizerOutput {
    pub address: NormalizedAddress,
    pub postal_candidate: PostalCandidate,
    pub issues: Vec<ValidationIssue>,
}

/// Working copy of the input; consumed spans are blanked with spaces so byte
/// offsets stay aligned with the original text.
struct Scratch {
    text: String,
}

impl Scratch {
    fn new(raw: &str) -> Self {
        Self {
            text: raw.to_string(),
        }
    }

    fn consume(&mut self, span: Range<usize>) {
        let blank = " ".repeat(span.len());
        self.text.replace_range(span, &blank);
    }
}

/// Normalize raw address text
pub fn normalize(raw: &str) -> NormalizerOutput {
    let mut scratch = Scratch::new(raw);
    let mut issues = Vec::new();
    let mut address = NormalizedAddress::default();

    let postal_candidate = extract_postal(raw, &mut scratch, &mut issues);
    if let PostalCandidate::Found(text) = &postal_candidate {
        address.postal_code = PostalCode::parse(text);
    }

    address.unit = extract_unit(&mut scratch);

    let mut segments = split_segments(&scratch.text);
    address.block = extract_block(&mut segments);
    let layout = assign_segments(segments);
    address.street = layout.street;
    address.building = layout.building;
    address.raw_remainder = layout.remainder;

    tracing::trace!(
        postal = ?address.postal_code,
        block = ?address.block,
        street = ?address.street,
        unit = ?address.unit,
        "Normalized address"
    );

    NormalizerOutput {
        address,
        postal_candidate,
        issues,
    }
}

// ============================================================================
// Postal code
// ============================================================================

fn extract_postal(
    raw: &str,
    scratch: &mut Scratch,
    issues: &mut Vec<ValidationIssue>,
) -> PostalCandidate {
    let six: Vec<_> = DIGIT_RUN.find_iter(raw).filter(|m| m.len() == 6).collect();

    if let Some(chosen) = six.last() {
        if six.len() > 1 && !is_trailing(&raw[chosen.end()..]) {
            let all: Vec<&str> = six.iter().map(|m| m.as_str()).collect();
            issues.push(ValidationIssue::new(
                IssueCode::PostalCodeAmbiguous,
                AddressField::PostalCode,
                format!(
                    "Several 6-digit numbers found ({}); using {}",
                    all.join(", "),
                    chosen.as_str()
                ),
            ));
        }
        scratch.consume(postal_span(raw, chosen.start(), chosen.end()));
        return PostalCandidate::Found(chosen.as_str().to_string());
    }

    if let Some(caps) = PREFIXED_CANDIDATE.captures_iter(raw).last() {
        if let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) {
            scratch.consume(whole.range());
            return PostalCandidate::Found(digits.as_str().to_string());
        }
    }

    // Split and wrong-length candidates must not come from a unit number
    let masked = blank_marked_units(raw);

    if let Some(split) = SPLIT_CANDIDATE.find_iter(&masked).last() {
        let digit_count = split.as_str().bytes().filter(u8::is_ascii_digit).count();
        if digit_count == 6 && is_trailing(&masked[split.end()..]) {
            scratch.consume(split.range());
            return PostalCandidate::Found(split.as_str().to_string());
        }
    }

    if let Some(run) = DIGIT_RUN.find_iter(&masked).last() {
        let wrong_length = run.len() == 5 || (7..=8).contains(&run.len());
        if wrong_length && is_trailing(&masked[run.end()..]) {
            scratch.consume(run.range());
            return PostalCandidate::Found(run.as_str().to_string());
        }
    }

    PostalCandidate::Absent
}

/// Replace `#`/`unit` spans with spaces, keeping byte offsets
fn blank_marked_units(raw: &str) -> String {
    MARKED_UNIT
        .replace_all(raw, |caps: &Captures| " ".repeat(caps[0].len()))
        .into_owned()
}

/// Widen a postal digit run over its `Singapore`/`S(` prefix and closing `)`
fn postal_span(raw: &str, start: usize, end: usize) -> Range<usize> {
    let start = POSTAL_PREFIX_TAIL
        .find(&raw[..start])
        .map_or(start, |m| m.start());
    let end = CLOSING_PAREN
        .find(&raw[end..])
        .map_or(end, |m| end + m.end());
    start..end
}

/// True when `rest` holds no address text besides units, country names and
/// punctuation
fn is_trailing(rest: &str) -> bool {
    let rest = UNIT_ANY.replace_all(rest, " ");
    let rest = COUNTRY_WORD.replace_all(&rest, " ");
    !rest.chars().any(char::is_alphanumeric)
}

// ============================================================================
// Unit
// ============================================================================

fn extract_unit(scratch: &mut Scratch) -> Option<String> {
    if let Some(caps) = UNIT_HASH_STRICT.captures(&scratch.text) {
        let unit = format!(
            "#{}-{}",
            caps[1].to_ascii_uppercase(),
            caps[2].to_ascii_uppercase()
        );
        consume_match(scratch, caps.get(0).map(|m| m.range()));
        return Some(unit);
    }

    if let Some(caps) = UNIT_HASH_LOOSE.captures(&scratch.text) {
        let body: String = caps[1]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        consume_match(scratch, caps.get(0).map(|m| m.range()));
        return Some(format!("#{}", body));
    }

    if let Some(caps) = UNIT_DASH.captures(&scratch.text) {
        let unit = format!("#{}-{}", &caps[1], caps[2].to_ascii_uppercase());
        consume_match(scratch, caps.get(0).map(|m| m.range()));
        return Some(unit);
    }

    None
}

fn consume_match(scratch: &mut Scratch, span: Option<Range<usize>>) {
    if let Some(span) = span {
        scratch.consume(span);
    }
}

// ============================================================================
// Segments, block, street
// ============================================================================

type Segment = Vec<String>;

/// Comma-separated segments as token lists, country names dropped
fn split_segments(text: &str) -> Vec<Segment> {
    let text: String = text
        .chars()
        .map(|c| match c {
            ';' | '|' | '\n' | '\r' => ',',
            '.' | '\t' => ' ',
            other => other,
        })
        .collect();

    text.split(',')
        .map(|segment| {
            segment
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .trim_matches(|c: char| matches!(c, '-' | '(' | ')' | ':' | '/' | '#'))
                .trim()
                .to_string()
        })
        .filter(|segment| !segment.is_empty() && !COUNTRY_SEGMENT.is_match(segment))
        .map(|segment| {
            TRAILING_COUNTRY
                .replace(&segment, "")
                .split_whitespace()
                .map(str::to_string)
                .collect::<Segment>()
        })
        .filter(|tokens| !tokens.is_empty())
        .collect()
}

fn is_street_word(token: &str) -> bool {
    let word = token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_lowercase();
    STREET_WORDS.contains(word.as_str())
}

fn looks_like_street(tokens: &[String]) -> bool {
    tokens.iter().any(|t| is_street_word(t))
}

fn has_alphabetic(tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|t| t.chars().any(char::is_alphabetic))
}

/// Find the block number and remove it from its segment
///
/// Split-out building prefixes (`Sunshine Court 5 Jalan Kayu`) become their own
/// segment so street assignment sees them separately.
fn extract_block(segments: &mut Vec<Segment>) -> Option<String> {
    // Prefixed: "Blk 123", "Block 288A", "Blk123"
    for segment in segments.iter_mut() {
        for i in 0..segment.len() {
            if let Some(caps) = BLOCK_PREFIX_JOINED.captures(&segment[i]) {
                let block = caps[1].to_ascii_uppercase();
                segment.remove(i);
                return Some(block);
            }
            if BLOCK_PREFIX.is_match(&segment[i])
                && segment
                    .get(i + 1)
                    .is_some_and(|next| BLOCK_NUMBER.is_match(next))
            {
                let block = segment[i + 1].to_ascii_uppercase();
                segment.drain(i..=i + 1);
                return Some(block);
            }
        }
    }

    // Leading house number: "123 Orchard Road"
    for segment in segments.iter_mut() {
        if segment.len() > 1 && BLOCK_NUMBER.is_match(&segment[0]) && has_alphabetic(&segment[1..]) {
            return Some(segment.remove(0).to_ascii_uppercase());
        }
    }

    // Building name, house number, street in one segment
    for idx in 0..segments.len() {
        let segment = &segments[idx];
        let split_at = (1..segment.len().saturating_sub(1)).find(|&i| {
            BLOCK_NUMBER.is_match(&segment[i])
                && looks_like_street(&segment[i + 1..])
                && segment[..i]
                    .iter()
                    .all(|t| !t.chars().any(|c| c.is_ascii_digit()))
        });
        if let Some(i) = split_at {
            let mut street = segments[idx].split_off(i);
            let block = street.remove(0).to_ascii_uppercase();
            segments.insert(idx + 1, street);
            return Some(block);
        }
    }

    // Bare number segment next to a street segment: "288A, Ang Mo Kio Ave 3"
    let bare = segments
        .iter()
        .position(|s| s.len() == 1 && BLOCK_NUMBER.is_match(&s[0]));
    if let Some(idx) = bare {
        let street_elsewhere = segments
            .iter()
            .enumerate()
            .any(|(i, s)| i != idx && looks_like_street(s));
        if street_elsewhere {
            let block = segments.remove(idx).remove(0).to_ascii_uppercase();
            return Some(block);
        }
    }

    None
}

struct SegmentLayout {
    street: Option<String>,
    building: Option<String>,
    remainder: String,
}

fn assign_segments(segments: Vec<Segment>) -> SegmentLayout {
    let segments: Vec<Segment> = segments.into_iter().filter(|s| !s.is_empty()).collect();

    let street_idx = segments
        .iter()
        .position(|s| looks_like_street(s))
        .or_else(|| segments.iter().position(|s| has_alphabetic(s)));

    let building_idx = segments.iter().enumerate().position(|(i, s)| {
        Some(i) != street_idx
            && !looks_like_street(s)
            && has_alphabetic(s)
            && !s.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()))
    });

    let mut street = None;
    let mut building = None;
    let mut rest = Vec::new();
    for (i, segment) in segments.into_iter().enumerate() {
        let text = segment.join(" ");
        if Some(i) == street_idx {
            street = Some(text);
        } else if Some(i) == building_idx {
            building = Some(text);
        } else {
            rest.push(text);
        }
    }

    SegmentLayout {
        street,
        building,
        remainder: rest.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(out: &NormalizerOutput) -> Option<&str> {
        out.address.postal_code.as_ref().map(PostalCode::as_str)
    }

    #[test]
    fn test_hdb_address_with_unit() {
        let out = normalize("Blk 123 Ang Mo Kio Ave 3 #12-345 560123");
        assert_eq!(code(&out), Some("560123"));
        assert_eq!(out.address.block.as_deref(), Some("123"));
        assert_eq!(out.address.street.as_deref(), Some("Ang Mo Kio Ave 3"));
        assert_eq!(out.address.unit.as_deref(), Some("#12-345"));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_leading_house_number() {
        let out = normalize("123 Orchard Road 238839");
        assert_eq!(code(&out), Some("238839"));
        assert_eq!(out.address.block.as_deref(), Some("123"));
        assert_eq!(out.address.street.as_deref(), Some("Orchard Road"));
        assert_eq!(out.address.unit, None);
    }

    #[test]
    fn test_postal_only() {
        let out = normalize("999999");
        assert_eq!(code(&out), Some("999999"));
        assert_eq!(out.address.block, None);
        assert_eq!(out.address.street, None);
        assert_eq!(out.address.raw_remainder, "");
    }

    #[test]
    fn test_missing_postal_code() {
        let out = normalize("Blk 50 Commonwealth Drive");
        assert_eq!(out.postal_candidate, PostalCandidate::Absent);
        assert_eq!(out.address.block.as_deref(), Some("50"));
        assert_eq!(out.address.street.as_deref(), Some("Commonwealth Drive"));
    }

    #[test]
    fn test_singapore_prefix_consumed() {
        let out = normalize("10 Bayfront Avenue, Singapore 018956");
        assert_eq!(code(&out), Some("018956"));
        assert_eq!(out.address.street.as_deref(), Some("Bayfront Avenue"));
        assert_eq!(out.address.raw_remainder, "");

        let out = normalize("Blk 5 Tampines St 11 S(520005)");
        assert_eq!(code(&out), Some("520005"));
        assert_eq!(out.address.street.as_deref(), Some("Tampines St 11"));
    }

    #[test]
    fn test_separated_postal_code_kept_as_candidate() {
        let out = normalize("Blk 123 Ang Mo Kio Ave 3 Singapore 560 123");
        assert_eq!(out.postal_candidate, PostalCandidate::Found("560 123".to_string()));
        assert_eq!(out.address.postal_code, None);
        assert_eq!(out.address.street.as_deref(), Some("Ang Mo Kio Ave 3"));
    }

    #[test]
    fn test_wrong_length_trailing_run() {
        let out = normalize("123 Orchard Road 23883");
        assert_eq!(out.postal_candidate, PostalCandidate::Found("23883".to_string()));
        assert_eq!(out.address.postal_code, None);
    }

    #[test]
    fn test_ambiguous_postal_takes_last_and_flags() {
        let out = normalize("560123 Ang Mo Kio 238839 Orchard Road");
        assert_eq!(code(&out), Some("238839"));
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].code, IssueCode::PostalCodeAmbiguous);
    }

    #[test]
    fn test_trailing_postal_not_ambiguous() {
        let out = normalize("Blk 560123 Ang Mo Kio Ave 3 560123 Singapore");
        assert_eq!(code(&out), Some("560123"));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn test_unit_forms() {
        assert_eq!(
            normalize("Blk 1 Jurong West St 91 # 05 - 12 640001").address.unit.as_deref(),
            Some("#05-12")
        );
        assert_eq!(
            normalize("Blk 1 Jurong West St 91 unit 05-12 640001").address.unit.as_deref(),
            Some("#05-12")
        );
        assert_eq!(
            normalize("1 Raffles Place #b1-05a 048616").address.unit.as_deref(),
            Some("#B1-05A")
        );
        assert_eq!(
            normalize("1 Raffles Place #PH 048616").address.unit.as_deref(),
            Some("#PH")
        );
    }

    #[test]
    fn test_block_after_street_segment() {
        let out = normalize("Ang Mo Kio Ave 3, Blk 288A, 560288");
        assert_eq!(out.address.block.as_deref(), Some("288A"));
        assert_eq!(out.address.street.as_deref(), Some("Ang Mo Kio Ave 3"));
    }

    #[test]
    fn test_bare_block_segment() {
        let out = normalize("288A, Ang Mo Kio Ave 3, 560288");
        assert_eq!(out.address.block.as_deref(), Some("288A"));
        assert_eq!(out.address.street.as_deref(), Some("Ang Mo Kio Ave 3"));
    }

    #[test]
    fn test_building_segment() {
        let out = normalize("Sunshine Court, 5 Jalan Kayu, 799999");
        assert_eq!(out.address.block.as_deref(), Some("5"));
        assert_eq!(out.address.street.as_deref(), Some("Jalan Kayu"));
        assert_eq!(out.address.building.as_deref(), Some("Sunshine Court"));
    }

    #[test]
    fn test_building_prefix_in_same_segment() {
        let out = normalize("Sunshine Court 5 Jalan Kayu 799999");
        assert_eq!(out.address.block.as_deref(), Some("5"));
        assert_eq!(out.address.street.as_deref(), Some("Jalan Kayu"));
        assert_eq!(out.address.building.as_deref(), Some("Sunshine Court"));
    }

    #[test]
    fn test_empty_and_whitespace() {
        let out = normalize("   ");
        assert_eq!(out.postal_candidate, PostalCandidate::Absent);
        assert_eq!(out.address, NormalizedAddress::default());
    }

    #[test]
    fn test_deterministic() {
        let raw = "Blk 288A, Ang Mo Kio Ave 3 #03-112 S(560288)";
        assert_eq!(normalize(raw), normalize(raw));
    }

    #[test]
    fn test_six_digit_unit_not_taken_as_postal_code() {
        let out = normalize("Blk 50 Commonwealth Drive #01-1234");
        assert_eq!(out.postal_candidate, PostalCandidate::Absent);
        assert_eq!(out.address.unit.as_deref(), Some("#01-1234"));
        assert_eq!(out.address.block.as_deref(), Some("50"));

        let out = normalize("Blk 50 Commonwealth Drive unit 01-12345");
        assert_eq!(out.postal_candidate, PostalCandidate::Absent);
        assert_eq!(out.address.unit.as_deref(), Some("#01-12345"));
    }

    #[test]
    fn test_split_postal_code_after_unit() {
        let out = normalize("Blk 50 Commonwealth Drive #01-1234 560 123");
        assert_eq!(out.postal_candidate, PostalCandidate::Found("560 123".to_string()));
        assert_eq!(out.address.unit.as_deref(), Some("#01-1234"));
    }
}
