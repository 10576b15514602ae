//! Route template compilation.

use regex::Regex;
use thiserror::Error;

use crate::params::PathParams;

/// Capture group substituted for every `/{name}` token.
///
/// The leading slash is optional and the segment may be empty, which makes
/// trailing parameter segments optional.
const PARAM_CAPTURE: &str = "[/]{0,1}([^/]*)";

/// Errors raised while compiling a route template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A `{` was never closed.
    #[error("unterminated parameter in route template '{template}'")]
    Unterminated {
        /// The offending template.
        template: String,
    },

    /// A `}` appeared without a matching `{`.
    #[error("unbalanced '}}' in route template '{template}'")]
    Unbalanced {
        /// The offending template.
        template: String,
    },

    /// A parameter token does not occupy a whole path segment.
    #[error("parameter '{name}' in route template '{template}' must follow a '/'")]
    NotSegment {
        /// The offending template.
        template: String,
        /// The parameter name.
        name: String,
    },

    /// A parameter has an empty or invalid name.
    #[error("invalid parameter name '{name}' in route template '{template}'")]
    InvalidName {
        /// The offending template.
        template: String,
        /// The rejected name.
        name: String,
    },

    /// The same parameter name is used twice.
    #[error("duplicate parameter '{name}' in route template '{template}'")]
    Duplicate {
        /// The offending template.
        template: String,
        /// The repeated name.
        name: String,
    },

    /// The generated expression was rejected by the regex engine.
    #[error("route template '{template}' failed to compile: {message}")]
    Regex {
        /// The offending template.
        template: String,
        /// Message from the regex engine.
        message: String,
    },
}

/// A compiled route template.
///
/// Holds an anchored matcher and the parameter names in declaration order.
/// The number of capture groups always equals the number of names.
///
/// # Example
///
/// ```rust
/// use tessera_router::CompiledPattern;
///
/// let pattern = CompiledPattern::compile("/user/{user}/slide/{name}").unwrap();
/// assert_eq!(pattern.param_names(), ["user", "name"]);
///
/// let params = pattern.captures("/user/ann/slide/intro").unwrap();
/// assert_eq!(params.get("user"), Some("ann"));
/// assert_eq!(params.get("name"), Some("intro"));
///
/// assert!(pattern.captures("/user/ann/slide/intro/extra").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl CompiledPattern {
    /// Compiles a route template.
    ///
    /// Literal text is matched verbatim. Every `/{name}` token becomes an
    /// optional segment capture.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let mut expr = String::with_capacity(template.len() * 2 + 2);
        let mut names: Vec<String> = Vec::new();
        let mut literal = String::new();
        expr.push('^');

        let mut rest = template;
        while let Some(idx) = rest.find(['{', '}']) {
            let (head, tail) = rest.split_at(idx);
            if tail.starts_with('}') {
                return Err(PatternError::Unbalanced {
                    template: template.to_string(),
                });
            }
            literal.push_str(head);

            let close = tail.find('}').ok_or_else(|| PatternError::Unterminated {
                template: template.to_string(),
            })?;
            let name = &tail[1..close];

            if name.is_empty() || name.contains(['{', '/']) {
                return Err(PatternError::InvalidName {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            // The slash in front of the token belongs to the capture.
            if literal.pop() != Some('/') {
                return Err(PatternError::NotSegment {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }
            if names.iter().any(|n| n == name) {
                return Err(PatternError::Duplicate {
                    template: template.to_string(),
                    name: name.to_string(),
                });
            }

            expr.push_str(&regex::escape(&literal));
            literal.clear();
            expr.push_str(PARAM_CAPTURE);
            names.push(name.to_string());

            rest = &tail[close + 1..];
        }
        literal.push_str(rest);
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| PatternError::Regex {
            template: template.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    /// Returns the original template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parameter names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.names
    }

    /// Returns `true` if the whole path matches.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches the whole path and binds captures to parameter names.
    ///
    /// Returns `None` when the path does not match.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let mut params = PathParams::with_capacity(self.names.len());
        for (i, name) in self.names.iter().enumerate() {
            let value = caps.get(i + 1).map_or("", |m| m.as_str());
            params.push(name.clone(), value);
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_static_pattern_is_exact() {
        let p = CompiledPattern::compile("/about").unwrap();
        assert!(p.is_match("/about"));
        assert!(!p.is_match("/about/"));
        assert!(!p.is_match("/aboutx"));
        assert!(!p.is_match("/x/about"));
        assert!(p.param_names().is_empty());
    }

    #[test]
    fn test_literal_dots_are_escaped() {
        let p = CompiledPattern::compile("/robots.txt").unwrap();
        assert!(p.is_match("/robots.txt"));
        assert!(!p.is_match("/robotsxtxt"));
    }

    #[test]
    fn test_trailing_param_is_optional() {
        let p = CompiledPattern::compile("/foo/{id}").unwrap();

        let params = p.captures("/foo/123").unwrap();
        assert_eq!(params.get("id"), Some("123"));

        let params = p.captures("/foo").unwrap();
        assert_eq!(params.get("id"), Some(""));

        let params = p.captures("/foo/").unwrap();
        assert_eq!(params.get("id"), Some(""));

        assert!(p.captures("/foo/1/2").is_none());
    }

    #[test]
    fn test_multiple_params_bind_positionally() {
        let p = CompiledPattern::compile("/user/{user}/slide/{name}/{page}").unwrap();
        assert_eq!(p.param_names(), ["user", "name", "page"]);

        let params = p.captures("/user/bob/slide/deck/4").unwrap();
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(pairs, vec![("user", "bob"), ("name", "deck"), ("page", "4")]);

        let params = p.captures("/user/bob/slide/deck").unwrap();
        assert_eq!(params.get("page"), Some(""));
    }

    #[test]
    fn test_malformed_templates() {
        assert!(matches!(
            CompiledPattern::compile("/foo/{id"),
            Err(PatternError::Unterminated { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/foo/id}"),
            Err(PatternError::Unbalanced { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/foo/{}"),
            Err(PatternError::InvalidName { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/foo-{id}"),
            Err(PatternError::NotSegment { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/{a}/{a}"),
            Err(PatternError::Duplicate { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_capture_count_matches_names(segs in prop::collection::vec("[a-z]{1,6}", 0..5)) {
            let template: String = segs.iter().map(|s| format!("/{{{s}}}")).collect();
            let unique: std::collections::HashSet<_> = segs.iter().collect();
            prop_assume!(unique.len() == segs.len());

            let p = CompiledPattern::compile(&template).unwrap();
            prop_assert_eq!(p.param_names().len(), segs.len());

            let path: String = segs.iter().map(|s| format!("/{s}")).collect();
            let params = p.captures(&path).unwrap();
            prop_assert_eq!(params.len(), segs.len());
            for s in &segs {
                prop_assert_eq!(params.get(s), Some(s.as_str()));
            }
        }

        #[test]
        fn prop_static_only_matches_itself(a in "/[a-z]{1,8}", b in "/[a-z]{1,8}") {
            let p = CompiledPattern::compile(&a).unwrap();
            prop_assert_eq!(p.is_match(&b), a == b);
        }
    }
}
