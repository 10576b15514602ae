//! The root configuration type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tessera_telemetry::LogFormat;

use crate::{ConfigError, LoggingSection, ServerSection, SettingsSection, ViewsSection};

/// Complete Tessera configuration.
///
/// Load it with [`ConfigLoader`](crate::ConfigLoader).
///
/// ```
/// use tessera_config::TesseraConfig;
///
/// let config = TesseraConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TesseraConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Response writer settings.
    #[serde(default)]
    pub settings: SettingsSection,

    /// Template and translation settings.
    #[serde(default)]
    pub views: ViewsSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TesseraConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> TesseraConfigBuilder {
        TesseraConfigBuilder::new()
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.views.default_lang.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "views.default_lang",
                "must not be empty",
            ));
        }

        if let Some(template) = &self.settings.error_template {
            if template.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "settings.error_template",
                    "must name at least one file",
                ));
            }
        }

        if let Err(e) = tessera_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        Ok(())
    }

    /// Local development preset: pretty debug logs and request dumps.
    ///
    /// ```
    /// use tessera_config::TesseraConfig;
    ///
    /// let config = TesseraConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// assert!(config.settings.dump_requests);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config.settings.dump_requests = true;
        config
    }

    /// Production preset: JSON logs at info.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.settings.dump_requests = false;
        config
    }
}

/// Builder for [`TesseraConfig`].
#[derive(Debug, Default)]
pub struct TesseraConfigBuilder {
    server: Option<ServerSection>,
    settings: Option<SettingsSection>,
    views: Option<ViewsSection>,
    logging: Option<LoggingSection>,
}

impl TesseraConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server section.
    #[must_use]
    pub fn server(mut self, server: ServerSection) -> Self {
        self.server = Some(server);
        self
    }

    /// Sets the settings section.
    #[must_use]
    pub fn settings(mut self, settings: SettingsSection) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Sets the views section.
    #[must_use]
    pub fn views(mut self, views: ViewsSection) -> Self {
        self.views = Some(views);
        self
    }

    /// Sets the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSection) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the configuration; unset sections take defaults.
    #[must_use]
    pub fn build(self) -> TesseraConfig {
        TesseraConfig {
            server: self.server.unwrap_or_default(),
            settings: self.settings.unwrap_or_default(),
            views: self.views.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Builds and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<TesseraConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
