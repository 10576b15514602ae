//! First-match route table.

use crate::params::PathParams;
use crate::pattern::{CompiledPattern, PatternError};

/// A route found by [`RouteTable::find`].
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The value registered with the matching pattern.
    pub value: &'a T,
    /// Parameters captured from the path.
    pub params: PathParams,
    /// Registration index of the matching route.
    pub index: usize,
}

/// An ordered list of compiled patterns.
///
/// Lookup walks the routes in registration order and returns the first one
/// whose pattern accepts the whole path. Overlapping templates are resolved by
/// that order alone.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    routes: Vec<(CompiledPattern, T)>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compiles `template` and appends it with `value`.
    pub fn insert(&mut self, template: &str, value: T) -> Result<(), PatternError> {
        let pattern = CompiledPattern::compile(template)?;
        self.routes.push((pattern, value));
        Ok(())
    }

    /// Finds the first route accepting `path`.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<RouteMatch<'_, T>> {
        self.routes
            .iter()
            .enumerate()
            .find_map(|(index, (pattern, value))| {
                pattern.captures(path).map(|params| RouteMatch {
                    value,
                    params,
                    index,
                })
            })
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over `(pattern, value)` in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&CompiledPattern, &T)> {
        self.routes.iter().map(|(p, v)| (p, v))
    }
}
