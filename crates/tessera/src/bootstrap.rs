//! Wiring from a loaded [`TesseraConfig`] to the server pieces.
//!
//! ```no_run
//! use tessera::bootstrap;
//! use tessera::config::ConfigLoader;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("tessera.toml")?
//!     .with_env_prefix("TESSERA")
//!     .load()?;
//! tessera::telemetry::init_logging(&bootstrap::log_config(&config))?;
//!
//! let dispatcher = bootstrap::dispatcher(&config)?
//!     // .route(...)
//!     .build()?;
//! tessera::server::Server::new(bootstrap::server_config(&config), dispatcher)
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;
use tessera_config::TesseraConfig;
use tessera_core::TesseraResult;
use tessera_server::{
    AcceptLanguageProvider, Dispatcher, DispatcherBuilder, ServerConfig, Settings, TemplateViews,
    Translations,
};
use tessera_telemetry::LogConfig;

/// Listener settings from the `[server]` section.
#[must_use]
pub fn server_config(config: &TesseraConfig) -> ServerConfig {
    let server = &config.server;
    ServerConfig::builder()
        .http_addr(server.http_addr.clone())
        .shutdown_timeout(Duration::from_secs(server.shutdown_timeout_secs))
        .request_timeout(Duration::from_millis(server.request_timeout_ms))
        .max_body_bytes(server.max_body_bytes)
        .build()
}

/// Response writer settings from the `[settings]` section.
#[must_use]
pub fn settings(config: &TesseraConfig) -> Settings {
    let section = &config.settings;
    Settings {
        unauthorized_page: section.unauthorized_page.clone(),
        forbidden_page: section.forbidden_page.clone(),
        error_template: section.error_template.clone(),
        dump_requests: section.dump_requests,
    }
}

/// Logging settings from the `[logging]` section.
#[must_use]
pub fn log_config(config: &TesseraConfig) -> LogConfig {
    let logging = &config.logging;
    LogConfig {
        enabled: logging.enabled,
        level: logging.level.clone(),
        format: logging.format,
        file_line_info: logging.include_location,
        ..LogConfig::production()
    }
}

/// The translation table named by `views.i18n_file`, or an empty one.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a `lang → key → text` object.
pub fn translations(config: &TesseraConfig) -> TesseraResult<Arc<Translations>> {
    match &config.views.i18n_file {
        Some(path) => Translations::load(path).map(Arc::new),
        None => Ok(Arc::new(Translations::new())),
    }
}

/// Template views rooted at `views.dir`.
#[must_use]
pub fn views(config: &TesseraConfig, translations: Arc<Translations>) -> TemplateViews {
    TemplateViews::new(&config.views.dir).with_translations(translations)
}

/// A dispatcher builder with views, language selection and settings
/// configured. Routes and the user provider are left to the caller.
///
/// # Errors
///
/// Fails if the translation table cannot be loaded.
pub fn dispatcher(config: &TesseraConfig) -> TesseraResult<DispatcherBuilder> {
    let translations = translations(config)?;
    if config.views.i18n_file.is_some() && !translations.has_lang(&config.views.default_lang) {
        tracing::warn!(
            default_lang = %config.views.default_lang,
            "Default language has no translations"
        );
    }

    Ok(Dispatcher::builder()
        .lang_provider(AcceptLanguageProvider::new(
            translations.clone(),
            config.views.default_lang.clone(),
        ))
        .views(views(config, translations))
        .settings(settings(config)))
}
