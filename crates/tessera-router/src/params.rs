//! Path parameter storage.
//!
//! Parameters are kept as `(name, value)` pairs in declaration order using a
//! small-vector so the common case (a handful of segments) stays on the stack.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Path parameters extracted from a matched route.
///
/// # Example
///
/// ```rust
/// use tessera_router::PathParams;
///
/// let mut params = PathParams::new();
/// params.push("user", "alice");
/// params.push("page", "");
///
/// assert_eq!(params.get("user"), Some("alice"));
/// assert_eq!(params.get("page"), Some(""));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parameter set with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: SmallVec::with_capacity(capacity),
        }
    }

    /// Appends a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if no parameters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut params = PathParams::new();
        params.push("a", "1");
        params.push("b", "2");

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("2"));
    }

    #[test]
    fn test_iter_preserves_order() {
        let params: PathParams = vec![
            ("user".to_string(), "alice".to_string()),
            ("name".to_string(), "deck".to_string()),
        ]
        .into_iter()
        .collect();

        let names: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["user", "name"]);
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let mut params = PathParams::with_capacity(2);
        for i in 0..8 {
            params.push(format!("p{i}"), i.to_string());
        }
        assert_eq!(params.len(), 8);
        assert_eq!(params.get("p7"), Some("7"));
    }
}
