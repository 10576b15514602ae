//! Media type identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A media type identifier such as `application/json`.
///
/// Parameters (`; charset=utf-8`) are stripped on construction through
/// [`MediaType::from_header`]; [`MediaType::new`] keeps the value as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    /// `application/json`
    pub const JSON: &'static str = "application/json";
    /// `text/html`
    pub const HTML: &'static str = "text/html";
    /// `text/plain`
    pub const TEXT: &'static str = "text/plain";

    /// Creates a media type from a string, trimming surrounding whitespace.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    /// Parses a `Content-Type` header value, dropping any parameters.
    ///
    /// Returns `None` for an empty value.
    ///
    /// ```
    /// use tessera_core::MediaType;
    ///
    /// let mt = MediaType::from_header("application/json; charset=utf-8").unwrap();
    /// assert_eq!(mt.as_str(), "application/json");
    /// assert!(MediaType::from_header("  ").is_none());
    /// ```
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            None
        } else {
            Some(Self(essence.to_string()))
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for `text/html` and `application/xhtml+xml`.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::HTML) || self.0.eq_ignore_ascii_case("application/xhtml+xml")
    }

    /// Returns `true` for `application/json` and any `+json` suffix type.
    #[must_use]
    pub fn is_json(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        lower == Self::JSON || lower.ends_with("+json")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MediaType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for MediaType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered list of media types; earlier entries are preferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTypes(Vec<MediaType>);

impl MediaTypes {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma separated list, skipping empty items.
    ///
    /// ```
    /// use tessera_core::MediaTypes;
    ///
    /// let types = MediaTypes::parse("application/json, text/html");
    /// assert_eq!(types.len(), 2);
    /// assert_eq!(types.to_string(), "application/json, text/html");
    /// ```
    #[must_use]
    pub fn parse(list: &str) -> Self {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(MediaType::new)
            .collect()
    }

    /// Returns `true` if `media_type` is in the list (exact comparison).
    #[must_use]
    pub fn contains(&self, media_type: &MediaType) -> bool {
        self.0.iter().any(|m| m == media_type)
    }

    /// Returns the first entry.
    #[must_use]
    pub fn first(&self) -> Option<&MediaType> {
        self.0.first()
    }

    /// Iterates in preference order.
    pub fn iter(&self) -> std::slice::Iter<'_, MediaType> {
        self.0.iter()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MediaTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(m.as_str())?;
        }
        Ok(())
    }
}

impl FromIterator<MediaType> for MediaTypes {
    fn from_iter<I: IntoIterator<Item = MediaType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MediaTypes {
    type Item = &'a MediaType;
    type IntoIter = std::slice::Iter<'a, MediaType>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<&str> for MediaTypes {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_strips_params() {
        assert_eq!(
            MediaType::from_header("text/html;charset=utf-8").unwrap(),
            MediaType::new("text/html")
        );
        assert!(MediaType::from_header("").is_none());
    }

    #[test]
    fn test_kind_checks() {
        assert!(MediaType::new("application/json").is_json());
        assert!(MediaType::new("application/problem+json").is_json());
        assert!(!MediaType::new("application/xml").is_json());
        assert!(MediaType::new("text/html").is_html());
        assert!(!MediaType::new("text/plain").is_html());
    }

    #[test]
    fn test_parse_list() {
        let types = MediaTypes::parse(" application/json ,, text/html ");
        let names: Vec<&str> = types.iter().map(MediaType::as_str).collect();
        assert_eq!(names, vec!["application/json", "text/html"]);
        assert!(types.contains(&MediaType::new("text/html")));
        assert!(!types.contains(&MediaType::new("text/*")));
    }
}
