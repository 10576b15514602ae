//! Logging setup for Tessera services.
//!
//! The dispatcher and listener emit `tracing` events with structured fields
//! (`request_id`, `http.method`, `http.path`, `http.status_code`,
//! `duration_ms`, `error.code`, `error.location`). This crate installs the
//! subscriber that writes them.
//!
//! ```rust,ignore
//! use tessera_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::production())?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
