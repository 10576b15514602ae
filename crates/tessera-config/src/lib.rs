//! Typed configuration for Tessera.
//!
//! - TOML and JSON files
//! - environment overrides named `PREFIX__SECTION__KEY`
//! - `.env` files via `dotenvy`
//! - strict parsing: unknown fields are errors
//!
//! ```no_run
//! use tessera_config::ConfigLoader;
//!
//! # fn main() -> Result<(), tessera_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("tessera.toml")?
//!     .with_env_prefix("TESSERA")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # File format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! max_body_bytes = 10485760
//!
//! [settings]
//! unauthorized_page = "pages/401.html"
//! forbidden_page = "pages/403.html"
//! error_template = "error.html"
//! dump_requests = false
//!
//! [views]
//! dir = "./views"
//! i18n_file = "i18n.json"
//! default_lang = "en-us"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{TesseraConfig, TesseraConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingSection, ServerSection, SettingsSection, ViewsSection};
pub use tessera_telemetry::LogFormat;
