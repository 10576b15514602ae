//! View rendering.
//!
//! The dispatcher only decides which view to render and hands it a model.
//! [`TemplateViews`] is the bundled engine: it loads every view group a
//! resource declares from the views directory at startup and renders it with
//! `minijinja`.

use minijinja::{context, Environment};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tessera_core::{TesseraError, TesseraResult, ViewBinding};
use thiserror::Error;

/// Error rendering a view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No view with that name was registered.
    #[error("view '{0}' is not registered")]
    Missing(String),

    /// The template failed while rendering.
    #[error("failed to render view '{view}': {message}")]
    Render {
        /// View group name.
        view: String,
        /// Engine message.
        message: String,
    },
}

/// Renders named views.
pub trait ViewEngine: Send + Sync + 'static {
    /// Loads a view group. Called once per binding at startup.
    fn register(&mut self, view: &ViewBinding) -> TesseraResult<()>;

    /// Renders `view` with `model` for `lang`.
    fn render(&self, view: &str, model: &Value, lang: &str) -> Result<String, ViewError>;
}

/// Translation table: language, then key, then text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translations(BTreeMap<String, BTreeMap<String, String>>);

impl Translations {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of `{ "lang": { "key": "text" } }`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// Reads the table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> TesseraResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| TesseraError::Translations {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|e| TesseraError::Translations {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Returns `true` if the table has entries for `lang`.
    #[must_use]
    pub fn has_lang(&self, lang: &str) -> bool {
        self.0.contains_key(lang)
    }

    /// Entries for `lang`.
    #[must_use]
    pub fn table(&self, lang: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(lang)
    }
}

/// `minijinja` backed views loaded from a directory.
///
/// Each file of a group is registered under its own name so templates can
/// include or import one another; the group name maps to the files joined in
/// order. Templates see `model`, `lang` and `i18n` (the translation entries
/// for `lang`), plus a `seq(n)` function yielding `0..n`.
pub struct TemplateViews {
    dir: PathBuf,
    env: Environment<'static>,
    translations: Arc<Translations>,
}

impl TemplateViews {
    /// Creates an engine reading views from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.add_function("seq", seq);
        Self {
            dir: dir.into(),
            env,
            translations: Arc::new(Translations::new()),
        }
    }

    /// Sets the translation table exposed as `i18n`.
    #[must_use]
    pub fn with_translations(mut self, translations: Arc<Translations>) -> Self {
        self.translations = translations;
        self
    }

    /// The views directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, view: &str, file: &str) -> TesseraResult<String> {
        let path = self.dir.join(file);
        std::fs::read_to_string(&path).map_err(|source| TesseraError::ViewRead {
            view: view.to_string(),
            path,
            source,
        })
    }

    fn add(&mut self, view: &str, name: String, source: String) -> TesseraResult<()> {
        self.env
            .add_template_owned(name, source)
            .map_err(|e| TesseraError::ViewCompile {
                view: view.to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Debug for TemplateViews {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateViews")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl ViewEngine for TemplateViews {
    fn register(&mut self, view: &ViewBinding) -> TesseraResult<()> {
        if self.env.get_template(view.name()).is_ok() {
            return Ok(());
        }

        let mut joined = String::new();
        for file in view.files() {
            let source = self.read(view.name(), file)?;
            joined.push_str(&source);
            if file.as_str() != view.name() {
                self.add(view.name(), file.clone(), source)?;
            }
        }
        self.add(view.name(), view.name().to_string(), joined)?;

        tracing::debug!(view = view.name(), files = view.files().len(), "Loaded view");
        Ok(())
    }

    fn render(&self, view: &str, model: &Value, lang: &str) -> Result<String, ViewError> {
        let template = self
            .env
            .get_template(view)
            .map_err(|_| ViewError::Missing(view.to_string()))?;
        template
            .render(context! {
                model => model,
                lang => lang,
                i18n => self.translations.table(lang),
            })
            .map_err(|e| ViewError::Render {
                view: view.to_string(),
                message: e.to_string(),
            })
    }
}

fn seq(n: i64) -> Vec<i64> {
    (0..n.max(0)).collect()
}
