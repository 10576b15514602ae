//! Content negotiation against an `Accept` header.
//!
//! The header is split on commas into candidates. Each candidate carries a
//! quality taken from its `q` parameter:
//!
//! - no `q` parameter: `1.0`
//! - a `q` value that does not parse as a finite number: `0.0` (the entry is
//!   kept and sinks to the end)
//!
//! Candidates are stable-sorted by descending quality. The first candidate, in
//! that order, that matches any produced type selects it; produced types are
//! tried in their declared order. A `*` inside a candidate matches one or more
//! characters other than `/`.

use crate::media::{MediaType, MediaTypes};

/// One entry of a parsed `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    /// Media range, e.g. `text/*`.
    pub range: String,
    /// Quality weight.
    pub quality: f32,
}

/// Parses an `Accept` header into entries ordered by descending quality.
///
/// An empty header is read as `*/*`.
///
/// ```
/// use tessera_core::negotiate::parse_accept;
///
/// let entries = parse_accept("text/*;q=0.8, application/json;q=0.9, image/png");
/// let ranges: Vec<&str> = entries.iter().map(|e| e.range.as_str()).collect();
/// assert_eq!(ranges, ["image/png", "application/json", "text/*"]);
/// ```
#[must_use]
pub fn parse_accept(header: &str) -> Vec<AcceptEntry> {
    let header = if header.trim().is_empty() { "*/*" } else { header };

    let mut entries: Vec<AcceptEntry> = header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let range = parts.next().unwrap_or_default().trim();
            if range.is_empty() {
                return None;
            }
            let quality = parts
                .filter_map(|p| p.split_once('='))
                .find(|(k, _)| k.trim().eq_ignore_ascii_case("q"))
                .map_or(1.0, |(_, v)| parse_quality(v));
            Some(AcceptEntry {
                range: range.to_string(),
                quality,
            })
        })
        .collect();

    // `sort_by` is stable, so ties keep header order.
    entries.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    entries
}

fn parse_quality(raw: &str) -> f32 {
    match raw.trim().parse::<f32>() {
        Ok(q) if q.is_finite() => q,
        _ => 0.0,
    }
}

/// Picks the produced type that best satisfies `accept`.
///
/// Returns `None` when nothing matches; the caller answers `406`.
///
/// ```
/// use tessera_core::{negotiate::negotiate, MediaTypes};
///
/// let produced = MediaTypes::parse("application/json,text/html");
/// let chosen = negotiate(&produced, "text/*; q=0.8, application/json; q=0.9");
/// assert_eq!(chosen.unwrap().as_str(), "application/json");
///
/// assert_eq!(negotiate(&produced, "").unwrap().as_str(), "application/json");
/// assert!(negotiate(&produced, "application/xml").is_none());
/// ```
#[must_use]
pub fn negotiate(produced: &MediaTypes, accept: &str) -> Option<MediaType> {
    parse_accept(accept).iter().find_map(|entry| {
        produced
            .iter()
            .find(|candidate| range_matches(&entry.range, candidate.as_str()))
            .cloned()
    })
}

/// Matches a media range against a concrete type.
///
/// Literal characters compare ASCII case-insensitively. `*` consumes one or
/// more characters but never crosses a `/`.
#[must_use]
pub fn range_matches(range: &str, media_type: &str) -> bool {
    glob(range.as_bytes(), media_type.as_bytes())
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => {
            let segment = text.iter().take_while(|&&c| c != b'/').count();
            (1..=segment).any(|n| glob(rest, &text[n..]))
        }
        Some((c, rest)) => match text.split_first() {
            Some((t, tail)) if t.eq_ignore_ascii_case(c) => glob(rest, tail),
            _ => false,
        },
    }
}
