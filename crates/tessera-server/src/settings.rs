//! Settings consumed by the response writer.

use std::path::PathBuf;

/// Response writer settings.
///
/// ```
/// use tessera_server::Settings;
///
/// let settings = Settings::new()
///     .unauthorized_page("static/401.html")
///     .error_template("error.html")
///     .dump_requests(true);
/// assert!(settings.forbidden_page.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// HTML page streamed with 401 responses when HTML was negotiated.
    pub unauthorized_page: Option<PathBuf>,
    /// HTML page streamed with 403 responses when HTML was negotiated.
    pub forbidden_page: Option<PathBuf>,
    /// View (file list under the views directory) rendered for 500 responses.
    pub error_template: Option<String>,
    /// Log each request head at debug level.
    pub dump_requests: bool,
}

impl Settings {
    /// Settings with nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the 401 fallback page.
    #[must_use]
    pub fn unauthorized_page(mut self, path: impl Into<PathBuf>) -> Self {
        self.unauthorized_page = Some(path.into());
        self
    }

    /// Sets the 403 fallback page.
    #[must_use]
    pub fn forbidden_page(mut self, path: impl Into<PathBuf>) -> Self {
        self.forbidden_page = Some(path.into());
        self
    }

    /// Sets the error view.
    #[must_use]
    pub fn error_template(mut self, view: impl Into<String>) -> Self {
        self.error_template = Some(view.into());
        self
    }

    /// Enables request dumps.
    #[must_use]
    pub fn dump_requests(mut self, on: bool) -> Self {
        self.dump_requests = on;
        self
    }
}
