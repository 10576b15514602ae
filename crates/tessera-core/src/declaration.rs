//! Per-verb declarative metadata for a resource type.
//!
//! A [`Declaration`] is built once per resource type, at registration. Each
//! table is keyed by HTTP verb with an optional `*` entry that applies to any
//! verb without its own entry. `HEAD` looks up `GET` before `*`.

use http::Method;
use std::collections::HashMap;

use crate::media::MediaTypes;
use crate::permission::RoleRequirement;

/// Key matching any verb.
pub const ANY_METHOD: &str = "*";

/// A view bound to a verb: one or more template files joined under one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBinding {
    name: String,
    files: Vec<String>,
}

impl ViewBinding {
    /// Parses a comma separated file list. The list itself is the view name.
    #[must_use]
    pub fn parse(files: &str) -> Self {
        let files: Vec<String> = files
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();
        Self {
            name: files.join(","),
            files,
        }
    }

    /// The group name used to look the view up at render time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The files making up the group, in order.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }
}

/// Declarative metadata for a resource type.
///
/// # Example
///
/// ```
/// use http::Method;
/// use tessera_core::Declaration;
///
/// let decl = Declaration::new()
///     .permit(Method::GET, "OWNER|ADMIN")
///     .permit_any("ADMIN")
///     .provides(Method::GET, "application/json,text/html")
///     .consumes(Method::POST, "application/x-www-form-urlencoded")
///     .view(Method::GET, "layout.html,slide.html");
///
/// assert_eq!(decl.required_roles(&Method::GET).unwrap().alternatives().len(), 2);
/// assert_eq!(decl.required_roles(&Method::DELETE).unwrap().alternatives(), ["ADMIN"]);
/// assert_eq!(decl.produced(&Method::HEAD).unwrap().len(), 2);
/// assert!(decl.consumed(&Method::GET).is_none());
/// assert_eq!(decl.view_for(&Method::GET).unwrap().name(), "layout.html,slide.html");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    roles: HashMap<String, RoleRequirement>,
    provides: HashMap<String, MediaTypes>,
    consumes: HashMap<String, MediaTypes>,
    views: HashMap<String, ViewBinding>,
}

impl Declaration {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires one of the `|` separated roles for `method`.
    pub fn permit(mut self, method: Method, roles: &str) -> Self {
        self.insert_roles(method.as_str(), roles);
        self
    }

    /// Requires one of the roles for verbs without their own entry.
    pub fn permit_any(mut self, roles: &str) -> Self {
        self.insert_roles(ANY_METHOD, roles);
        self
    }

    // An empty role list is no entry at all, so lookup falls through to `*`.
    fn insert_roles(&mut self, key: &str, roles: &str) {
        let requirement = RoleRequirement::parse(roles);
        if requirement.is_empty() {
            self.roles.remove(key);
        } else {
            self.roles.insert(key.to_string(), requirement);
        }
    }

    /// Declares the produced types for `method`, in preference order.
    pub fn provides(mut self, method: Method, types: impl Into<MediaTypes>) -> Self {
        self.provides
            .insert(method.as_str().to_string(), types.into());
        self
    }

    /// Declares produced types for verbs without their own entry.
    pub fn provides_any(mut self, types: impl Into<MediaTypes>) -> Self {
        self.provides.insert(ANY_METHOD.to_string(), types.into());
        self
    }

    /// Declares the accepted request body types for `method`.
    pub fn consumes(mut self, method: Method, types: impl Into<MediaTypes>) -> Self {
        self.consumes
            .insert(method.as_str().to_string(), types.into());
        self
    }

    /// Declares accepted body types for verbs without their own entry.
    pub fn consumes_any(mut self, types: impl Into<MediaTypes>) -> Self {
        self.consumes.insert(ANY_METHOD.to_string(), types.into());
        self
    }

    /// Binds a view (comma separated template files) to `method`.
    pub fn view(mut self, method: Method, files: &str) -> Self {
        self.views
            .insert(method.as_str().to_string(), ViewBinding::parse(files));
        self
    }

    /// Binds a view for verbs without their own entry.
    pub fn view_any(mut self, files: &str) -> Self {
        self.views
            .insert(ANY_METHOD.to_string(), ViewBinding::parse(files));
        self
    }

    /// Role requirement for `method`, if any.
    #[must_use]
    pub fn required_roles(&self, method: &Method) -> Option<&RoleRequirement> {
        lookup(&self.roles, method)
    }

    /// Produced types for `method`, if declared.
    #[must_use]
    pub fn produced(&self, method: &Method) -> Option<&MediaTypes> {
        lookup(&self.provides, method).filter(|t| !t.is_empty())
    }

    /// Accepted request body types for `method`, if declared.
    #[must_use]
    pub fn consumed(&self, method: &Method) -> Option<&MediaTypes> {
        lookup(&self.consumes, method).filter(|t| !t.is_empty())
    }

    /// View bound to `method`, if any.
    #[must_use]
    pub fn view_for(&self, method: &Method) -> Option<&ViewBinding> {
        lookup(&self.views, method)
    }

    /// Every view bound by this declaration.
    pub fn views(&self) -> impl Iterator<Item = &ViewBinding> {
        self.views.values()
    }
}

fn lookup<'a, T>(table: &'a HashMap<String, T>, method: &Method) -> Option<&'a T> {
    table
        .get(method.as_str())
        .or_else(|| {
            if *method == Method::HEAD {
                table.get(Method::GET.as_str())
            } else {
                None
            }
        })
        .or_else(|| table.get(ANY_METHOD))
}
