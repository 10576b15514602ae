//! # Tessera Core
//!
//! Core types for the Tessera resource dispatch engine.
//!
//! - [`RequestContext`] - per-request state handed to a resource instance
//! - [`Declaration`] - per-verb roles, produced and consumed types, and views
//! - [`Outcome`] - the tagged result of handling a request
//! - [`negotiate`](negotiate::negotiate) - `Accept` header negotiation
//! - [`check_access`] - role evaluation
//! - [`Fault`] - located, coded handler failures
//! - [`TesseraError`] - startup errors

#![doc(html_root_url = "https://docs.rs/tessera-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod declaration;
mod error;
pub mod fault;
mod media;
pub mod negotiate;
mod outcome;
mod permission;

pub use context::{RequestContext, RequestId, ResponseHeaders, SetCookie};
pub use declaration::{Declaration, ViewBinding, ANY_METHOD};
pub use error::{TesseraError, TesseraResult};
pub use fault::Fault;
pub use media::{MediaType, MediaTypes};
pub use outcome::{ByteStream, Entity, Outcome};
pub use permission::{check_access, Access, RoleRequirement, Roles};
pub use tessera_router::PathParams;
