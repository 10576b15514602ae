//! The dispatch pipeline.
//!
//! For each request, in order:
//!
//! 1. match the path against the routes, first registered wins (404)
//! 2. build the context: caller, path parameters, language
//! 3. negotiate the produced type when one is declared (406), always
//!    setting `Vary: Accept` when negotiation runs
//! 4. instantiate the resource
//! 5. check the request `Content-Type` when consumed types are declared (415)
//! 6. run the pre-hook; an outcome from it ends the request
//! 7. check roles (401 for anonymous callers, else 403)
//! 8. invoke the verb capability (501 for other verbs, 405 when missing or
//!    when the handler returns nothing)
//!
//! Panics in steps 6 and 8 are caught and become a 500 carrying a code
//! derived from the panic message.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::header::{self, HeaderValue};
use http::Request;
use hyper::body::Body as _;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tessera_core::negotiate::negotiate;
use tessera_core::{
    check_access, fault, Access, Fault, Outcome, RequestContext, TesseraResult, ViewBinding,
};
use tessera_router::RouteTable;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::providers::{AnonymousProvider, LangProvider, NoLangProvider, UserProvider};
use crate::resource::{Capability, Endpoint, Resource, Route};
use crate::response::{HttpResponse, Rendering, ResponseWriter};
use crate::settings::Settings;
use crate::views::{TemplateViews, ViewEngine};

/// Views directory used when no engine is configured.
pub const DEFAULT_VIEWS_DIR: &str = "views";

/// Facts about the connection a request arrived on.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// Peer address.
    pub remote_addr: Option<SocketAddr>,
    /// Cancelled when the client goes away.
    pub disconnect: CancellationToken,
}

/// Routes requests to resources and writes their outcomes.
///
/// Immutable once built; share it behind an `Arc`.
pub struct Dispatcher {
    routes: RouteTable<Box<dyn Endpoint>>,
    users: Arc<dyn UserProvider>,
    langs: Arc<dyn LangProvider>,
    writer: ResponseWriter,
}

impl Dispatcher {
    /// Starts building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Handles a request with no connection information.
    pub async fn dispatch(&self, request: Request<Bytes>) -> HttpResponse {
        self.dispatch_with(request, Connection::default()).await
    }

    /// Handles a request.
    pub async fn dispatch_with(&self, request: Request<Bytes>, conn: Connection) -> HttpResponse {
        let started = Instant::now();
        let (parts, body) = request.into_parts();

        if self.writer.settings().dump_requests {
            tracing::debug!(
                method = %parts.method,
                uri = %parts.uri,
                version = ?parts.version,
                headers = ?parts.headers,
                "Request dump"
            );
        }

        let mut ctx = RequestContext::new(parts.method, parts.uri, parts.headers, body)
            .with_disconnect_token(conn.disconnect);
        if let Some(addr) = conn.remote_addr {
            ctx = ctx.with_remote_addr(addr);
        }

        let span = tracing::info_span!(
            "request",
            request_id = %ctx.request_id(),
            http.method = %ctx.method(),
            http.path = %ctx.raw_path(),
        );

        async move {
            let partial = ctx.headers().contains_key(header::RANGE);
            let (outcome, view) = self.resolve(&mut ctx).await;
            let kind = outcome.kind();
            log_outcome(&outcome, &ctx);

            let rendering = Rendering {
                chosen_type: ctx.chosen_type(),
                view,
                lang: ctx.lang(),
                partial,
                headers: ctx.response_headers().snapshot(),
            };
            let response = self.writer.write(outcome, rendering).await;

            tracing::info!(
                http.status_code = response.status().as_u16(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                remote_addr = ?ctx.remote_addr(),
                bytes = ?response.body().size_hint().exact(),
                outcome = kind,
                "{} {}",
                ctx.method(),
                ctx.raw_path()
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn resolve<'s>(&'s self, ctx: &mut RequestContext) -> (Outcome, Option<&'s str>) {
        let Some(matched) = self.routes.find(ctx.path()) else {
            return (Outcome::not_found(), None);
        };
        let endpoint = matched.value;
        let declaration = endpoint.declaration();
        let method = ctx.method().clone();

        let identity = self.users.identify(ctx);
        ctx.set_identity(identity.username, identity.roles);
        ctx.set_path_params(matched.params);
        let lang = self.langs.select(ctx);
        ctx.set_lang(lang);

        let view = declaration.view_for(&method).map(ViewBinding::name);

        if let Some(produced) = declaration.produced(&method) {
            ctx.response_headers()
                .insert(header::VARY, HeaderValue::from_static("Accept"));
            let chosen = negotiate(produced, ctx.header(header::ACCEPT).unwrap_or_default());
            if chosen.is_none() {
                return (Outcome::NotAcceptable(produced.clone()), view);
            }
            ctx.set_chosen_type(chosen);
        }

        let mut instance = endpoint.instantiate(ctx.clone());

        if let Some(consumed) = declaration.consumed(&method) {
            if !ctx.content_type().is_some_and(|t| consumed.contains(t)) {
                return (Outcome::unsupported_media_type(), view);
            }
        }

        if let Some(pre) = instance.pre() {
            if let Some(outcome) = contain(pre).await {
                return (outcome, view);
            }
        }

        match check_access(declaration.required_roles(&method), ctx.username(), ctx.roles()) {
            Access::Granted => {}
            Access::Unauthenticated => {
                return (Outcome::unauthorized(self.users.auth_header(ctx)), view);
            }
            Access::Denied => return (Outcome::forbidden(), view),
        }

        let Some(capability) = Capability::for_method(&method) else {
            return (Outcome::not_implemented(), view);
        };
        let outcome = match instance.invoke(capability) {
            Some(call) => contain(call).await,
            None => None,
        };
        let outcome = outcome.unwrap_or_else(|| Outcome::MethodNotAllowed(instance.allowed()));
        (outcome, view)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

/// Runs a handler future, turning a panic into an internal error.
async fn contain(call: BoxFuture<'_, Option<Outcome>>) -> Option<Outcome> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Some(Fault::from_panic(payload).into()),
    }
}

fn log_outcome(outcome: &Outcome, ctx: &RequestContext) {
    match outcome {
        Outcome::InternalError {
            location,
            reason,
            code,
        } => tracing::error!(
            error.location = %location,
            error.code = code,
            error.message = %reason,
            "Handler fault"
        ),
        Outcome::UnsupportedMediaType(_) => tracing::info!(
            content_type = ctx.header(header::CONTENT_TYPE).unwrap_or_default(),
            "Unsupported media type"
        ),
        Outcome::ClientGone => tracing::info!("Client disconnected"),
        _ => {}
    }
}

/// Builder for [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    routes: Vec<(String, Box<dyn Endpoint>)>,
    users: Option<Arc<dyn UserProvider>>,
    langs: Option<Arc<dyn LangProvider>>,
    views: Option<Box<dyn ViewEngine>>,
    settings: Settings,
}

impl DispatcherBuilder {
    /// Appends a route.
    ///
    /// Routes are tried in the order they are added and the first whose
    /// template matches the whole path handles the request. Register specific
    /// templates before overlapping general ones.
    #[must_use]
    pub fn route<R: Resource>(mut self, route: Route<R>) -> Self {
        self.routes.push(route.into_endpoint());
        self
    }

    /// Sets the user provider. Defaults to [`AnonymousProvider`].
    #[must_use]
    pub fn user_provider(mut self, provider: impl UserProvider) -> Self {
        self.users = Some(Arc::new(provider));
        self
    }

    /// Sets the language provider. Defaults to [`NoLangProvider`].
    #[must_use]
    pub fn lang_provider(mut self, provider: impl LangProvider) -> Self {
        self.langs = Some(Arc::new(provider));
        self
    }

    /// Sets the view engine. Defaults to [`TemplateViews`] over
    /// [`DEFAULT_VIEWS_DIR`].
    #[must_use]
    pub fn views(mut self, engine: impl ViewEngine) -> Self {
        self.views = Some(Box::new(engine));
        self
    }

    /// Sets the response writer settings.
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Compiles the routes and loads every declared view.
    ///
    /// Fails on the first malformed template or unreadable view.
    pub fn build(self) -> TesseraResult<Dispatcher> {
        fault::install_panic_hook();

        let mut views = self
            .views
            .unwrap_or_else(|| Box::new(TemplateViews::new(DEFAULT_VIEWS_DIR)));
        let mut routes = RouteTable::new();

        for (template, endpoint) in self.routes {
            for binding in endpoint.declaration().views() {
                views.register(binding)?;
            }
            routes.insert(&template, endpoint)?;
        }

        let mut settings = self.settings;
        if let Some(error_view) = settings.error_template.take() {
            let binding = ViewBinding::parse(&error_view);
            views.register(&binding)?;
            settings.error_template = Some(binding.name().to_string());
        }

        tracing::debug!(routes = routes.len(), "Dispatcher built");

        Ok(Dispatcher {
            routes,
            users: self.users.unwrap_or_else(|| Arc::new(AnonymousProvider)),
            langs: self.langs.unwrap_or_else(|| Arc::new(NoLangProvider)),
            writer: ResponseWriter::new(Arc::from(views), Arc::new(settings)),
        })
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.routes.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Get, Post, PreHook};
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use tessera_core::{Declaration, TesseraError};

    #[derive(Clone)]
    struct Note {
        ctx: Option<RequestContext>,
    }

    impl Resource for Note {
        fn instantiate(&self, ctx: RequestContext) -> Self {
            Self { ctx: Some(ctx) }
        }

        fn declaration() -> Declaration {
            Declaration::new()
                .provides(Method::GET, "text/plain")
                .consumes(Method::POST, "application/json")
        }
    }

    impl Get for Note {
        async fn get(&mut self) -> Option<Outcome> {
            let id = self.ctx.as_ref()?.path_param("id")?;
            if id == "boom" {
                panic!("note {id} exploded");
            }
            if id == "none" {
                return None;
            }
            Some(Outcome::text(format!("note:{id}")))
        }
    }

    impl Post for Note {
        async fn post(&mut self) -> Option<Outcome> {
            Some(Outcome::no_content())
        }
    }

    impl PreHook for Note {
        async fn pre(&mut self) -> Option<Outcome> {
            let ctx = self.ctx.as_ref()?;
            (ctx.param("halt") == Some("1")).then(|| Outcome::bad_request("halted"))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .route(Route::new("/notes/{id}", Note { ctx: None }).get().post().pre())
            .build()
            .unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    async fn body(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_get_with_param() {
        let resp = dispatcher().dispatch(request(Method::GET, "/notes/7")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::VARY], "Accept");
        assert_eq!(body(resp).await, "note:7");
    }

    #[tokio::test]
    async fn test_unmatched_path() {
        let resp = dispatcher().dispatch(request(Method::GET, "/other")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_none_becomes_method_not_allowed() {
        let resp = dispatcher().dispatch(request(Method::GET, "/notes/none")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()[header::ALLOW], "HEAD, GET, POST");
    }

    #[tokio::test]
    async fn test_unknown_verb_is_not_implemented() {
        let resp = dispatcher().dispatch(request(Method::PATCH, "/notes/1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_consumed_type_is_exact() {
        let d = dispatcher();
        let resp = d.dispatch(request(Method::POST, "/notes/1")).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let req = Request::builder()
            .method(Method::POST)
            .uri("/notes/1")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        assert_eq!(d.dispatch(req).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_pre_hook_short_circuits() {
        let resp = dispatcher()
            .dispatch(request(Method::GET, "/notes/1?halt=1"))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(resp).await, "halted");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let d = dispatcher();
        let first = d.dispatch(request(Method::GET, "/notes/boom")).await;
        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let code = fault::fault_code("note boom exploded");
        assert_eq!(body(first).await, format!("internal server error: {code}"));

        // The dispatcher keeps serving.
        let next = d.dispatch(request(Method::GET, "/notes/2")).await;
        assert_eq!(next.status(), StatusCode::OK);
    }

    #[test]
    fn test_bad_template_fails_build() {
        let err = Dispatcher::builder()
            .route(Route::new("/notes/{id", Note { ctx: None }).get())
            .build()
            .unwrap_err();
        assert!(matches!(err, TesseraError::Route(_)));
    }
}
