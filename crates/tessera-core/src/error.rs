//! Startup errors.
//!
//! Request handling never fails with a Rust error; every request ends in an
//! [`Outcome`](crate::Outcome). [`TesseraError`] covers what can go wrong
//! while registering routes and loading views.

use std::path::PathBuf;
use tessera_router::PatternError;
use thiserror::Error;

/// Result type alias using [`TesseraError`].
pub type TesseraResult<T> = Result<T, TesseraError>;

/// Errors raised while building a dispatcher.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// A route template did not compile.
    #[error("invalid route: {0}")]
    Route(#[from] PatternError),

    /// A view file could not be read.
    #[error("failed to read view '{view}' from {}: {source}", path.display())]
    ViewRead {
        /// View group name.
        view: String,
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A view template did not parse.
    #[error("failed to compile view '{view}': {message}")]
    ViewCompile {
        /// View group name.
        view: String,
        /// Parser message.
        message: String,
    },

    /// The translation table could not be loaded.
    #[error("failed to load translations from {}: {message}", path.display())]
    Translations {
        /// Table location.
        path: PathBuf,
        /// Failure message.
        message: String,
    },

    /// A fallback page could not be read.
    #[error("failed to read page {}: {source}", path.display())]
    Page {
        /// Page location.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
