//! Caller roles and role requirements.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of roles held by the caller of one request.
///
/// # Example
///
/// ```
/// use tessera_core::Roles;
///
/// let mut roles = Roles::new();
/// roles.add("OWNER");
/// assert!(roles.contains("OWNER"));
/// assert!(!roles.contains("ADMIN"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roles(BTreeSet<String>);

impl Roles {
    /// Creates an empty role set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role.
    pub fn add(&mut self, role: impl Into<String>) {
        self.0.insert(role.into());
    }

    /// Returns `true` if the role is held.
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Returns `true` if no roles are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the held roles.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Roles {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A role requirement made of alternatives.
///
/// Written as `A|B|C`: any one of the roles satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRequirement {
    alternatives: Vec<String>,
}

impl RoleRequirement {
    /// Parses an `A|B` expression. Blank alternatives are dropped.
    #[must_use]
    pub fn parse(expr: &str) -> Self {
        Self {
            alternatives: expr
                .split('|')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Returns `true` if no alternative survived parsing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Returns the accepted roles.
    #[must_use]
    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// Returns `true` if the caller holds at least one alternative.
    #[must_use]
    pub fn is_satisfied_by(&self, roles: &Roles) -> bool {
        self.alternatives.iter().any(|r| roles.contains(r))
    }
}

/// Result of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The request may proceed.
    Granted,
    /// The caller is anonymous and a role is required.
    Unauthenticated,
    /// The caller is known but holds none of the required roles.
    Denied,
}

/// Evaluates an optional requirement for a caller.
///
/// No requirement means no restriction. An empty `username` marks the caller
/// as anonymous.
#[must_use]
pub fn check_access(requirement: Option<&RoleRequirement>, username: &str, roles: &Roles) -> Access {
    match requirement {
        None => Access::Granted,
        Some(req) if req.is_satisfied_by(roles) => Access::Granted,
        Some(_) if username.is_empty() => Access::Unauthenticated,
        Some(_) => Access::Denied,
    }
}
