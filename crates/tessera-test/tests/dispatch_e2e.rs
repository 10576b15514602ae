//! End-to-end dispatch tests.
//!
//! These drive a small slide-library application through the whole pipeline:
//!
//! 1. Route match - first registered template wins
//! 2. Context - caller, path parameters, language
//! 3. Negotiation - `Accept` against produced types, `Vary: Accept`
//! 4. Consumed types - exact `Content-Type` match
//! 5. Pre-hook - may end the request before the permission check
//! 6. Permission - 401 for anonymous callers, 403 for the others
//! 7. Invocation - 501 for unknown verbs, 405 with `Allow` when unsupported
//! 8. Recovery - panics become 500 with a stable code

use http::{Method, StatusCode};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tessera_core::fault::fault_code;
use tessera_core::{Declaration, Outcome, RequestContext, Roles};
use tessera_server::{
    AcceptLanguageProvider, BasicAuthProvider, Delete, Dispatcher, Get, Post, PreHook, Put,
    Resource, Route, Settings, TemplateViews, Translations,
};
use tessera_test::TestClient;

// =============================================================================
// Application
// =============================================================================

struct Home;

impl Resource for Home {
    fn instantiate(&self, _ctx: RequestContext) -> Self {
        Self
    }
}

impl Get for Home {
    async fn get(&mut self) -> Option<Outcome> {
        Some(Outcome::text("home"))
    }
}

/// A slide deck. Readable by anyone, writable by owners.
#[derive(Default)]
struct Deck {
    ctx: Option<RequestContext>,
}

impl Resource for Deck {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn declaration() -> Declaration {
        Declaration::new()
            .provides(Method::GET, "application/json,text/html")
            .view(Method::GET, "deck.html")
            .permit(Method::PUT, "OWNER")
            .permit(Method::DELETE, "OWNER|ADMIN")
    }
}

impl Get for Deck {
    async fn get(&mut self) -> Option<Outcome> {
        let id = self.ctx.as_ref()?.path_param("id")?;
        if id.is_empty() {
            return Some(Outcome::json(&json!({"decks": ["intro", "roadmap"]})));
        }
        Some(Outcome::json(&json!({"id": id, "pages": 3})))
    }
}

impl Put for Deck {
    async fn put(&mut self) -> Option<Outcome> {
        Some(Outcome::no_content())
    }
}

impl Delete for Deck {
    async fn delete(&mut self) -> Option<Outcome> {
        // Deleting the listing is not a thing.
        let id = self.ctx.as_ref()?.path_param("id")?;
        (!id.is_empty()).then(Outcome::no_content)
    }
}

/// Owner-only page with a maintenance switch in its pre-hook.
struct Vault {
    ctx: Option<RequestContext>,
}

impl Resource for Vault {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn declaration() -> Declaration {
        Declaration::new()
            .permit_any("OWNER")
            .provides(Method::GET, "text/html,text/plain")
    }
}

impl PreHook for Vault {
    async fn pre(&mut self) -> Option<Outcome> {
        let ctx = self.ctx.as_ref()?;
        (ctx.param("maintenance") == Some("1")).then(|| Outcome::service_unavailable(30))
    }
}

impl Get for Vault {
    async fn get(&mut self) -> Option<Outcome> {
        let user = self.ctx.as_ref()?.username().to_string();
        Some(Outcome::text(format!("welcome {user}")))
    }
}

/// Accepts form posts only.
struct Upload {
    ctx: Option<RequestContext>,
}

impl Resource for Upload {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn declaration() -> Declaration {
        Declaration::new().consumes(Method::POST, "application/x-www-form-urlencoded")
    }
}

impl Post for Upload {
    async fn post(&mut self) -> Option<Outcome> {
        let ctx = self.ctx.as_ref()?;
        let Some(title) = ctx.param("title") else {
            return Some(Outcome::bad_request("missing title"));
        };
        let tags = ctx.param_array("tag").join("+");
        Some(Outcome::text(format!("{title} [{tags}]")))
    }
}

struct Explode {
    ctx: Option<RequestContext>,
}

impl Resource for Explode {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }
}

impl Get for Explode {
    async fn get(&mut self) -> Option<Outcome> {
        let what = self.ctx.as_ref()?.path_param("what")?.to_string();
        panic!("{what} went off");
    }
}

/// Long poll for progress; gives up when the client leaves.
struct Progress {
    ctx: Option<RequestContext>,
}

impl Resource for Progress {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }
}

impl Get for Progress {
    async fn get(&mut self) -> Option<Outcome> {
        let ctx = self.ctx.as_ref()?;
        tokio::select! {
            () = ctx.client_gone() => Some(Outcome::client_gone()),
            () = tokio::time::sleep(Duration::from_secs(30)) => Some(Outcome::text("done")),
        }
    }
}

struct Greeting {
    ctx: Option<RequestContext>,
}

impl Resource for Greeting {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }
}

impl Get for Greeting {
    async fn get(&mut self) -> Option<Outcome> {
        Some(Outcome::text(self.ctx.as_ref()?.lang().to_string()))
    }
}

/// Echoes the author name. The empty role list places no restriction.
struct Author {
    ctx: Option<RequestContext>,
}

impl Resource for Author {
    fn instantiate(&self, ctx: RequestContext) -> Self {
        Self { ctx: Some(ctx) }
    }

    fn declaration() -> Declaration {
        Declaration::new().permit(Method::GET, "")
    }
}

impl Get for Author {
    async fn get(&mut self) -> Option<Outcome> {
        Some(Outcome::text(self.ctx.as_ref()?.path_param("name")?.to_string()))
    }
}

struct Relocated {
    target: &'static str,
    temporary: bool,
}

impl Resource for Relocated {
    fn instantiate(&self, _ctx: RequestContext) -> Self {
        Self {
            target: self.target,
            temporary: self.temporary,
        }
    }
}

impl Get for Relocated {
    async fn get(&mut self) -> Option<Outcome> {
        Some(if self.temporary {
            Outcome::temp_redirect(self.target)
        } else {
            Outcome::moved_permanently(self.target)
        })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

struct App {
    client: TestClient,
    _dir: TempDir,
}

fn users() -> BasicAuthProvider {
    BasicAuthProvider::new("slides", |user, password| match (user, password) {
        ("ann", "secret") => Some(Roles::from_iter(["OWNER"])),
        ("bob", "hunter2") => Some(Roles::from_iter(["READER"])),
        ("cy", "root") => Some(Roles::from_iter(["ADMIN"])),
        _ => None,
    })
}

fn app_with(settings: impl FnOnce(&TempDir) -> Settings) -> App {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("deck.html"),
        "<h1>{{ i18n.title }}</h1><p>{{ model.id }}:{% for p in seq(model.pages) %}[{{ p }}]{% endfor %}</p>",
    )
    .unwrap();
    fs::write(dir.path().join("error.html"), "<h1>Oops {{ model.code }}</h1>").unwrap();
    fs::write(dir.path().join("401.html"), "<p>please sign in</p>").unwrap();

    let translations = Arc::new(
        Translations::from_json(
            r#"{"en-us": {"title": "Decks"}, "fr": {"title": "Diapos"}, "zh-tw": {"title": "簡報"}}"#,
        )
        .unwrap(),
    );

    let dispatcher = Dispatcher::builder()
        .route(Route::new("/", Home).get())
        .route(Route::new("/about", Home).get())
        .route(Route::new("/deck/{id}", Deck::default()).get().put().delete())
        // Shadowed by the template above.
        .route(Route::new("/deck/special", Home).get())
        .route(Route::new("/vault", Vault { ctx: None }).get().pre())
        .route(Route::new("/upload", Upload { ctx: None }).post())
        .route(Route::new("/explode/{what}", Explode { ctx: None }).get())
        .route(Route::new("/progress", Progress { ctx: None }).get())
        .route(Route::new("/greeting", Greeting { ctx: None }).get())
        .route(Route::new("/my docs", Home).get())
        .route(Route::new("/author/{name}", Author { ctx: None }).get())
        .route(
            Route::new(
                "/old",
                Relocated {
                    target: "/deck/intro",
                    temporary: false,
                },
            )
            .get(),
        )
        .route(
            Route::new(
                "/later",
                Relocated {
                    target: "/deck/roadmap",
                    temporary: true,
                },
            )
            .get(),
        )
        .user_provider(users())
        .lang_provider(AcceptLanguageProvider::new(translations.clone(), "en-us"))
        .views(TemplateViews::new(dir.path()).with_translations(translations))
        .settings(settings(&dir))
        .build()
        .unwrap();

    App {
        client: TestClient::new(dispatcher),
        _dir: dir,
    }
}

fn app() -> App {
    app_with(|_| Settings::new())
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_static_routes_match_exactly() {
    let app = app();

    app.client
        .get("/about")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("home");

    for path in ["/about/", "/about/x", "/abou", "/aboutx", "/nope"] {
        app.client
            .get(path)
            .send()
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_routes_match_decoded_path() {
    let app = app();

    app.client
        .get("/my%20docs")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("home");
    app.client
        .get("/author/J%C3%B6rg")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("Jörg");
}

#[tokio::test]
async fn test_trailing_parameter_is_optional() {
    let app = app();

    app.client
        .get("/deck/42")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&json!({"id": "42", "pages": 3}));

    let listing = json!({"decks": ["intro", "roadmap"]});
    app.client
        .get("/deck")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&listing);
    app.client
        .get("/deck/")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_eq(&listing);

    app.client
        .get("/deck/42/extra")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let app = app();

    app.client
        .get("/deck/special")
        .send()
        .await
        .assert_json_eq(&json!({"id": "special", "pages": 3}));
}

// =============================================================================
// Negotiation
// =============================================================================

#[tokio::test]
async fn test_quality_ordering_picks_json() {
    let app = app();

    app.client
        .get("/deck/7")
        .accept("text/*; q=0.8, application/json; q=0.9")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "application/json")
        .assert_header("vary", "Accept");
}

#[tokio::test]
async fn test_missing_or_empty_accept_picks_first_type() {
    let app = app();

    app.client
        .get("/deck/7")
        .send()
        .await
        .assert_header("content-type", "application/json");
    app.client
        .get("/deck/7")
        .accept("")
        .send()
        .await
        .assert_header("content-type", "application/json");
}

#[tokio::test]
async fn test_html_renders_bound_view() {
    let app = app();

    app.client
        .get("/deck/7")
        .accept("text/html,application/xhtml+xml;q=0.9")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "text/html")
        .assert_body_eq("<h1>Decks</h1><p>7:[0][1][2]</p>");
}

#[tokio::test]
async fn test_not_acceptable_lists_produced_types() {
    let app = app();

    app.client
        .get("/deck/7")
        .accept("application/xml")
        .send()
        .await
        .assert_status(StatusCode::NOT_ACCEPTABLE)
        .assert_header("vary", "Accept")
        .assert_body_eq("application/json, text/html\n");
}

#[tokio::test]
async fn test_no_vary_without_produced_types() {
    let app = app();

    app.client
        .get("/about")
        .accept("application/xml")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_no_header("vary");
}

// =============================================================================
// Consumed types and forms
// =============================================================================

#[tokio::test]
async fn test_form_post_is_parsed() {
    let app = app();

    app.client
        .post("/upload?tag=q3")
        .form(&[("title", "Roadmap"), ("tag", "draft")])
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("Roadmap [q3+draft]");

    app.client
        .post("/upload")
        .form(&[("tag", "draft")])
        .send()
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_body_eq("missing title");
}

#[tokio::test]
async fn test_unexpected_body_type_is_rejected() {
    let app = app();

    app.client
        .post("/upload")
        .json(&json!({"title": "Roadmap"}))
        .send()
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);

    app.client
        .post("/upload")
        .body("title=Roadmap")
        .send()
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

// =============================================================================
// Permissions and pre-hooks
// =============================================================================

#[tokio::test]
async fn test_owner_role_required() {
    let app = app();

    app.client
        .get("/vault")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("www-authenticate", "Basic realm=\"slides\"");

    app.client
        .get("/vault")
        .basic_auth("ann", "wrong")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.client
        .get("/vault")
        .basic_auth("bob", "hunter2")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_no_header("www-authenticate");

    app.client
        .get("/vault")
        .basic_auth("ann", "secret")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("welcome ann");
}

#[tokio::test]
async fn test_permissions_per_verb() {
    let app = app();

    // Reading needs no role.
    app.client
        .get("/deck/7")
        .send()
        .await
        .assert_status(StatusCode::OK);

    app.client
        .put("/deck/7")
        .basic_auth("bob", "hunter2")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.client
        .put("/deck/7")
        .basic_auth("ann", "secret")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Either alternative is enough.
    app.client
        .delete("/deck/7")
        .basic_auth("cy", "root")
        .send()
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.client
        .put("/deck/7")
        .basic_auth("cy", "root")
        .send()
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_role_list_is_unrestricted() {
    let app = app();

    app.client
        .get("/author/ann")
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_body_eq("ann");
}

#[tokio::test]
async fn test_pre_hook_runs_before_permission_check() {
    let app = app();

    app.client
        .get("/vault?maintenance=1")
        .send()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE)
        .assert_header("retry-after", "30");
}

#[tokio::test]
async fn test_unauthorized_page_for_html_callers() {
    let app = app_with(|dir| Settings::new().unauthorized_page(dir.path().join("401.html")));

    app.client
        .get("/vault")
        .accept("text/html")
        .send()
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("content-type", "text/html; charset=utf-8")
        .assert_header("www-authenticate", "Basic realm=\"slides\"")
        .assert_body_eq("<p>please sign in</p>");

    // Plain text callers get the status message.
    let resp = app.client.get("/vault").accept("text/plain").send().await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
    assert_ne!(resp.text().unwrap(), "<p>please sign in</p>");
}

// =============================================================================
// Capabilities
// =============================================================================

#[tokio::test]
async fn test_unsupported_capability_lists_allowed() {
    let app = app();

    app.client
        .post("/about")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "HEAD, GET");

    app.client
        .post("/deck/7")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "HEAD, GET, PUT, DELETE");
}

#[tokio::test]
async fn test_empty_result_is_method_not_allowed() {
    let app = app();

    app.client
        .delete("/deck")
        .basic_auth("ann", "secret")
        .send()
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "HEAD, GET, PUT, DELETE");
}

#[tokio::test]
async fn test_unknown_verb_is_not_implemented() {
    let app = app();

    app.client
        .request(Method::PATCH, "/about")
        .send()
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED);
    app.client
        .request(Method::OPTIONS, "/deck/7")
        .send()
        .await
        .assert_status(StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_head_uses_get_capability() {
    let app = app();

    let resp = app.client.head("/deck/7").send().await;
    resp.assert_status(StatusCode::OK)
        .assert_header("content-type", "application/json");
    assert!(resp.body().is_empty());
}

// =============================================================================
// Fault recovery
// =============================================================================

#[tokio::test]
async fn test_panic_yields_stable_code() {
    let app = app();

    let first = app.client.get("/explode/fuse").send().await;
    let second = app.client.get("/explode/fuse").send().await;
    let other = app.client.get("/explode/mine").send().await;

    first.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    first.assert_body_eq(format!(
        "internal server error: {}",
        fault_code("fuse went off")
    ));
    assert_eq!(first.body(), second.body());
    assert_ne!(first.body(), other.body());

    // The fault text never reaches the client.
    assert!(!first.text().unwrap().contains("went off"));

    // Still serving.
    app.client
        .get("/about")
        .send()
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_error_template_renders_code() {
    let app = app_with(|_| Settings::new().error_template("error.html"));

    app.client
        .get("/explode/fuse")
        .send()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_header("content-type", "text/html; charset=utf-8")
        .assert_body_eq(format!("<h1>Oops {}</h1>", fault_code("fuse went off")));
}

// =============================================================================
// Misc outcomes
// =============================================================================

#[tokio::test]
async fn test_redirects() {
    let app = app();

    app.client
        .get("/old")
        .send()
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY)
        .assert_header("location", "/deck/intro")
        .assert_body_eq("/deck/intro\n");

    let resp = app.client.get("/later").send().await;
    resp.assert_status(StatusCode::TEMPORARY_REDIRECT)
        .assert_header("location", "/deck/roadmap");
    assert!(resp.body().is_empty());
}

#[tokio::test]
async fn test_client_gone_while_waiting() {
    let app = app();

    let resp = app.client.get("/progress").disconnected().send().await;
    assert_eq!(resp.status_code(), 499);
    assert!(resp.body().is_empty());
}

#[tokio::test]
async fn test_language_selection() {
    let app = app();

    let resp = app
        .client
        .get("/greeting")
        .accept_language("de;q=0.9, fr;q=0.5, zh-TW;q=0.7")
        .send()
        .await;
    resp.assert_body_eq("zh-tw");
    let cookie = resp.header_str("set-cookie").unwrap();
    assert!(cookie.starts_with("lang=zh-tw; Path=/"), "{cookie}");

    app.client
        .get("/greeting")
        .cookie("lang", "fr")
        .accept_language("zh-TW")
        .send()
        .await
        .assert_body_eq("fr")
        .assert_no_header("set-cookie");

    app.client
        .get("/greeting")
        .send()
        .await
        .assert_body_eq("en-us");

    app.client
        .get("/deck/7")
        .cookie("lang", "fr")
        .accept("text/html")
        .send()
        .await
        .assert_body_eq("<h1>Diapos</h1><p>7:[0][1][2]</p>");
}

#[tokio::test]
async fn test_identical_requests_get_identical_responses() {
    let app = app();

    for path in ["/deck/7", "/deck/7?x=1", "/nope", "/vault"] {
        let first = app.client.get(path).accept("application/json").send().await;
        let second = app.client.get(path).accept("application/json").send().await;
        assert_eq!(first.status(), second.status(), "{path}");
        assert_eq!(first.body(), second.body(), "{path}");
    }
}
