//! # Tessera
//!
//! **Resource-oriented HTTP dispatch**
//!
//! Tessera maps URL templates to resource types and runs every request through
//! one fixed pipeline:
//!
//! - 🧭 **First-match routing** – `{name}` segments are captured, trailing ones are optional
//! - 🤝 **Content negotiation** – `Accept` qualities against the types a verb produces
//! - 🔒 **Role checks** – per-verb role alternatives with a `*` fallback
//! - 🧯 **Fault containment** – handler panics become a 500 with a stable code
//! - 🖨️ **Uniform responses** – one tagged [`Outcome`](core::Outcome) per request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tessera::prelude::*;
//!
//! struct Deck {
//!     ctx: Option<RequestContext>,
//! }
//!
//! impl Resource for Deck {
//!     fn instantiate(&self, ctx: RequestContext) -> Self {
//!         Self { ctx: Some(ctx) }
//!     }
//!
//!     fn declaration() -> Declaration {
//!         Declaration::new()
//!             .provides(Method::GET, "application/json,text/html")
//!             .view(Method::GET, "layout.html,deck.html")
//!             .permit(Method::PUT, "OWNER")
//!     }
//! }
//!
//! impl Get for Deck {
//!     async fn get(&mut self) -> Option<Outcome> {
//!         let id = self.ctx.as_ref()?.path_param("id")?;
//!         Some(Outcome::json(&serde_json::json!({ "id": id })))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .route(Route::new("/deck/{id}", Deck { ctx: None }).get())
//!         .build()?;
//!
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .build(dispatcher)
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Request → Route → Context → Negotiate → Instantiate → Consumes → Pre-hook
//!                                                                      ↓
//! Response ← ResponseWriter ← Recover ← Invoke ← Capability ← Permission
//! ```

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bootstrap;

// Re-export core types
pub use tessera_core as core;

// Re-export router types
pub use tessera_router as router;

// Re-export server types
pub use tessera_server as server;

// Re-export configuration types
pub use tessera_config as config;

// Re-export logging setup
pub use tessera_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use tessera::prelude::*;
///
/// let decl = Declaration::new().provides(Method::GET, "application/json");
/// assert!(decl.produced(&Method::HEAD).is_some());
/// ```
pub mod prelude {
    pub use tessera_core::{
        Declaration, Entity, MediaType, MediaTypes, Outcome, RequestContext, Roles, SetCookie,
        TesseraError, TesseraResult,
    };

    pub use tessera_server::{
        AcceptLanguageProvider, AnonymousProvider, BasicAuthProvider, Delete, Dispatcher, Get,
        Identity, LangProvider, Post, PreHook, Put, Resource, Route, Server, Settings,
        ShutdownSignal, TemplateViews, Translations, UserProvider, ViewEngine,
    };

    pub use tessera_config::{ConfigLoader, TesseraConfig};

    pub use http::Method;
}
