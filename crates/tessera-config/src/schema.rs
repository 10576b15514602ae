//! Configuration sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessera_telemetry::LogFormat;

/// Listener section.
///
/// ```
/// use tessera_config::ServerSection;
///
/// let server = ServerSection::default();
/// assert_eq!(server.http_addr, "0.0.0.0:8080");
/// assert_eq!(server.max_body_bytes, 10 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Body read timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// Response writer section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// HTML page streamed with 401 responses when HTML was negotiated.
    #[serde(default)]
    pub unauthorized_page: Option<PathBuf>,

    /// HTML page streamed with 403 responses when HTML was negotiated.
    #[serde(default)]
    pub forbidden_page: Option<PathBuf>,

    /// View rendered for 500 responses, given the fault code.
    #[serde(default)]
    pub error_template: Option<String>,

    /// Log every request head at debug level.
    #[serde(default)]
    pub dump_requests: bool,
}

/// Views section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ViewsSection {
    /// Template root.
    #[serde(default = "default_views_dir")]
    pub dir: PathBuf,

    /// Translation table, `lang -> key -> text`, as JSON.
    #[serde(default)]
    pub i18n_file: Option<PathBuf>,

    /// Language used when nothing else matches.
    #[serde(default = "default_lang")]
    pub default_lang: String,
}

impl Default for ViewsSection {
    fn default() -> Self {
        Self {
            dir: default_views_dir(),
            i18n_file: None,
            default_lang: default_lang(),
        }
    }
}

fn default_views_dir() -> PathBuf {
    PathBuf::from("./views")
}

fn default_lang() -> String {
    "en-us".to_string()
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
