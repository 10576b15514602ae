//! Resources and their verb capabilities.
//!
//! A resource type implements [`Resource`] plus any of the capability traits
//! [`Get`], [`Post`], [`Put`], [`Delete`] and [`PreHook`]. A [`Route`] binds
//! the capabilities at registration; each binding is checked by the compiler
//! through the trait bound on the corresponding builder method.
//!
//! # Example
//!
//! ```rust
//! use tessera_core::{Declaration, Outcome, RequestContext};
//! use tessera_server::{Get, Resource, Route};
//! use http::Method;
//!
//! struct Slide {
//!     ctx: Option<RequestContext>,
//!     greeting: &'static str,
//! }
//!
//! impl Resource for Slide {
//!     fn instantiate(&self, ctx: RequestContext) -> Self {
//!         Self { ctx: Some(ctx), greeting: self.greeting }
//!     }
//!
//!     fn declaration() -> Declaration {
//!         Declaration::new().provides(Method::GET, "application/json")
//!     }
//! }
//!
//! impl Get for Slide {
//!     async fn get(&mut self) -> Option<Outcome> {
//!         let name = self.ctx.as_ref()?.path_param("name")?.to_string();
//!         Some(Outcome::text(format!("{} {name}", self.greeting)))
//!     }
//! }
//!
//! let route = Route::new("/slide/{name}", Slide { ctx: None, greeting: "hello" }).get();
//! assert_eq!(route.template(), "/slide/{name}");
//! ```

use futures_util::future::BoxFuture;
use http::Method;
use std::future::Future;
use tessera_core::{Declaration, Outcome, RequestContext};

/// A URL-addressable resource type.
///
/// The registered value is a template. For every request the dispatcher calls
/// [`instantiate`](Resource::instantiate) on it to obtain a fresh instance
/// that owns the request context.
pub trait Resource: Send + Sync + Sized + 'static {
    /// Builds the per-request instance from this template.
    fn instantiate(&self, ctx: RequestContext) -> Self;

    /// Per-verb metadata for this type. Read once, at registration.
    fn declaration() -> Declaration {
        Declaration::new()
    }
}

/// Handles `GET` and `HEAD`.
pub trait Get: Resource {
    /// Returns `None` to answer 405.
    fn get(&mut self) -> impl Future<Output = Option<Outcome>> + Send;
}

/// Handles `POST`.
pub trait Post: Resource {
    /// Returns `None` to answer 405.
    fn post(&mut self) -> impl Future<Output = Option<Outcome>> + Send;
}

/// Handles `PUT`.
pub trait Put: Resource {
    /// Returns `None` to answer 405.
    fn put(&mut self) -> impl Future<Output = Option<Outcome>> + Send;
}

/// Handles `DELETE`.
pub trait Delete: Resource {
    /// Returns `None` to answer 405.
    fn delete(&mut self) -> impl Future<Output = Option<Outcome>> + Send;
}

/// Runs before the permission check.
///
/// Returning `Some` ends the request with that outcome.
pub trait PreHook: Resource {
    /// Returns `None` to continue.
    fn pre(&mut self) -> impl Future<Output = Option<Outcome>> + Send;
}

/// A verb capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `GET` and `HEAD`.
    Get,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `DELETE`.
    Delete,
}

impl Capability {
    /// Capabilities in the order they are listed in `Allow`.
    pub const ALL: [Self; 4] = [Self::Get, Self::Post, Self::Put, Self::Delete];

    /// The capability serving `method`, or `None` if the verb is unsupported.
    #[must_use]
    pub fn for_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }

    /// Verbs contributed to `Allow`.
    #[must_use]
    pub fn verbs(self) -> &'static [&'static str] {
        match self {
            Self::Get => &["HEAD", "GET"],
            Self::Post => &["POST"],
            Self::Put => &["PUT"],
            Self::Delete => &["DELETE"],
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Get => 0,
            Self::Post => 1,
            Self::Put => 2,
            Self::Delete => 3,
        }
    }
}

type Handler<R> = for<'a> fn(&'a mut R) -> BoxFuture<'a, Option<Outcome>>;

fn call_get<R: Get>(r: &mut R) -> BoxFuture<'_, Option<Outcome>> {
    Box::pin(r.get())
}

fn call_post<R: Post>(r: &mut R) -> BoxFuture<'_, Option<Outcome>> {
    Box::pin(r.post())
}

fn call_put<R: Put>(r: &mut R) -> BoxFuture<'_, Option<Outcome>> {
    Box::pin(r.put())
}

fn call_delete<R: Delete>(r: &mut R) -> BoxFuture<'_, Option<Outcome>> {
    Box::pin(r.delete())
}

fn call_pre<R: PreHook>(r: &mut R) -> BoxFuture<'_, Option<Outcome>> {
    Box::pin(r.pre())
}

struct Capabilities<R> {
    verbs: [Option<Handler<R>>; 4],
    pre: Option<Handler<R>>,
}

impl<R> Clone for Capabilities<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Capabilities<R> {}

impl<R> Capabilities<R> {
    const fn empty() -> Self {
        Self {
            verbs: [None; 4],
            pre: None,
        }
    }

    fn allowed(&self) -> Vec<String> {
        Capability::ALL
            .iter()
            .filter(|c| self.verbs[c.slot()].is_some())
            .flat_map(|c| c.verbs().iter().map(|v| (*v).to_string()))
            .collect()
    }
}

/// A route template bound to a resource template and its capabilities.
///
/// Routes are matched in registration order; the first matching template
/// wins.
pub struct Route<R: Resource> {
    template: String,
    prototype: R,
    capabilities: Capabilities<R>,
}

impl<R: Resource> Route<R> {
    /// Creates a route with no capabilities bound.
    pub fn new(template: impl Into<String>, prototype: R) -> Self {
        Self {
            template: template.into(),
            prototype,
            capabilities: Capabilities::empty(),
        }
    }

    /// The route template.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Binds [`Get`].
    pub fn get(mut self) -> Self
    where
        R: Get,
    {
        self.capabilities.verbs[Capability::Get.slot()] = Some(call_get::<R>);
        self
    }

    /// Binds [`Post`].
    pub fn post(mut self) -> Self
    where
        R: Post,
    {
        self.capabilities.verbs[Capability::Post.slot()] = Some(call_post::<R>);
        self
    }

    /// Binds [`Put`].
    pub fn put(mut self) -> Self
    where
        R: Put,
    {
        self.capabilities.verbs[Capability::Put.slot()] = Some(call_put::<R>);
        self
    }

    /// Binds [`Delete`].
    pub fn delete(mut self) -> Self
    where
        R: Delete,
    {
        self.capabilities.verbs[Capability::Delete.slot()] = Some(call_delete::<R>);
        self
    }

    /// Binds [`PreHook`].
    pub fn pre(mut self) -> Self
    where
        R: PreHook,
    {
        self.capabilities.pre = Some(call_pre::<R>);
        self
    }

    pub(crate) fn into_endpoint(self) -> (String, Box<dyn Endpoint>) {
        let endpoint = Bound {
            declaration: R::declaration(),
            prototype: self.prototype,
            capabilities: self.capabilities,
        };
        (self.template, Box::new(endpoint))
    }
}

/// A registered resource with its type erased.
pub(crate) trait Endpoint: Send + Sync {
    fn declaration(&self) -> &Declaration;
    fn instantiate(&self, ctx: RequestContext) -> Box<dyn Instance>;
}

/// A per-request resource instance.
pub(crate) trait Instance: Send {
    fn pre(&mut self) -> Option<BoxFuture<'_, Option<Outcome>>>;
    fn invoke(&mut self, capability: Capability) -> Option<BoxFuture<'_, Option<Outcome>>>;
    fn allowed(&self) -> Vec<String>;
}

struct Bound<R: Resource> {
    declaration: Declaration,
    prototype: R,
    capabilities: Capabilities<R>,
}

impl<R: Resource> Endpoint for Bound<R> {
    fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    fn instantiate(&self, ctx: RequestContext) -> Box<dyn Instance> {
        Box::new(Live {
            resource: self.prototype.instantiate(ctx),
            capabilities: self.capabilities,
        })
    }
}

struct Live<R: Resource> {
    resource: R,
    capabilities: Capabilities<R>,
}

impl<R: Resource> Instance for Live<R> {
    fn pre(&mut self) -> Option<BoxFuture<'_, Option<Outcome>>> {
        let handler = self.capabilities.pre?;
        Some(handler(&mut self.resource))
    }

    fn invoke(&mut self, capability: Capability) -> Option<BoxFuture<'_, Option<Outcome>>> {
        let handler = self.capabilities.verbs[capability.slot()]?;
        Some(handler(&mut self.resource))
    }

    fn allowed(&self) -> Vec<String> {
        self.capabilities.allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Uri};

    struct Echo {
        ctx: Option<RequestContext>,
    }

    impl Resource for Echo {
        fn instantiate(&self, ctx: RequestContext) -> Self {
            Self { ctx: Some(ctx) }
        }
    }

    impl Get for Echo {
        async fn get(&mut self) -> Option<Outcome> {
            let path = self.ctx.as_ref()?.path().to_string();
            Some(Outcome::text(path))
        }
    }

    impl Delete for Echo {
        async fn delete(&mut self) -> Option<Outcome> {
            None
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            Method::GET,
            Uri::from_static("/echo"),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn test_capability_for_method() {
        assert_eq!(Capability::for_method(&Method::HEAD), Some(Capability::Get));
        assert_eq!(Capability::for_method(&Method::DELETE), Some(Capability::Delete));
        assert_eq!(Capability::for_method(&Method::PATCH), None);
        assert_eq!(Capability::for_method(&Method::OPTIONS), None);
    }

    #[test]
    fn test_allowed_lists_head_before_get() {
        let (_, endpoint) = Route::new("/echo", Echo { ctx: None })
            .delete()
            .get()
            .into_endpoint();
        let instance = endpoint.instantiate(ctx());
        assert_eq!(instance.allowed(), vec!["HEAD", "GET", "DELETE"]);
    }

    #[tokio::test]
    async fn test_invoke_bound_capability() {
        let (_, endpoint) = Route::new("/echo", Echo { ctx: None }).get().into_endpoint();
        let mut instance = endpoint.instantiate(ctx());

        assert!(instance.pre().is_none());
        assert!(instance.invoke(Capability::Post).is_none());

        let outcome = instance.invoke(Capability::Get).unwrap().await;
        match outcome {
            Some(Outcome::Ok(entity)) => assert_eq!(entity.to_plain_text(), "/echo"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
