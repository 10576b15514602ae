//! # Tessera Server
//!
//! The dispatch pipeline and HTTP listener for Tessera.
//!
//! - [`Route`] binds a URL template to a [`Resource`] and its verb capabilities
//! - [`Dispatcher`] matches, negotiates, authorizes and invokes
//! - [`ResponseWriter`] turns an [`Outcome`](tessera_core::Outcome) into a response
//! - [`Server`] serves a dispatcher over HTTP/1.1 with graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_server::{BasicAuthProvider, Dispatcher, Route, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder()
//!         .route(Route::new("/docs/{id}", Docs::default()).get().put())
//!         .user_provider(BasicAuthProvider::new("docs", check_password))
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

#![doc(html_root_url = "https://docs.rs/tessera-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod dispatcher;
mod providers;
mod resource;
mod response;
mod server;
mod settings;
pub mod shutdown;
mod views;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use dispatcher::{Connection, Dispatcher, DispatcherBuilder, DEFAULT_VIEWS_DIR};
pub use providers::{
    AcceptLanguageProvider, AnonymousProvider, BasicAuthProvider, Identity, LangProvider,
    NoLangProvider, UserProvider, LANG_COOKIE,
};
pub use resource::{Capability, Delete, Get, Post, PreHook, Put, Resource, Route};
pub use response::{HttpResponse, ResponseBody, ResponseWriter, CLIENT_CLOSED_REQUEST};
pub use server::{Server, ServerBuilder, ServerError};
pub use settings::Settings;
pub use shutdown::ShutdownSignal;
pub use views::{TemplateViews, Translations, ViewEngine, ViewError};
