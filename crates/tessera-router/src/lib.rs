//! Route template compiler and first-match route table for Tessera.
//!
//! A route template is a path with `{name}` segments, for example
//! `/user/{user}/slide/{name}`. Each template is compiled once, at
//! registration time, into a [`CompiledPattern`]: an anchored matcher plus
//! the ordered list of parameter names bound positionally to its captures.
//!
//! Parameter segments are *optional*. The template `/foo/{id}` matches both
//! `/foo/123` (`id = "123"`) and `/foo` (`id = ""`).
//!
//! # Example
//!
//! ```rust
//! use tessera_router::RouteTable;
//!
//! let mut table = RouteTable::new();
//! table.insert("/users/{id}", "user").unwrap();
//! table.insert("/users", "list").unwrap();
//!
//! let m = table.find("/users/42").unwrap();
//! assert_eq!(*m.value, "user");
//! assert_eq!(m.params.get("id"), Some("42"));
//!
//! // `/users/{id}` was registered first, so it also wins for `/users`.
//! let m = table.find("/users").unwrap();
//! assert_eq!(*m.value, "user");
//! assert_eq!(m.params.get("id"), Some(""));
//! ```
//!
//! # Matching order
//!
//! Routes are tried in registration order and the first pattern that accepts
//! the whole path wins. There is no specificity ranking: when templates
//! overlap, register the more specific one first.

#![forbid(unsafe_code)]

mod params;
mod pattern;
mod table;

pub use params::PathParams;
pub use pattern::{CompiledPattern, PatternError};
pub use table::{RouteMatch, RouteTable};
