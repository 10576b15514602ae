//! Caller identity and language selection.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use http::header;
use std::sync::Arc;
use std::time::Duration;
use tessera_core::negotiate::parse_accept;
use tessera_core::{RequestContext, Roles, SetCookie};

use crate::views::Translations;

/// Who is calling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// User name; empty for anonymous callers.
    pub username: String,
    /// Roles held by the caller.
    pub roles: Roles,
}

impl Identity {
    /// The anonymous caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A named caller with roles.
    pub fn user<I, S>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }
}

/// Resolves the caller of a request.
pub trait UserProvider: Send + Sync + 'static {
    /// Identifies the caller. Return [`Identity::anonymous`] when unknown.
    fn identify(&self, ctx: &RequestContext) -> Identity;

    /// Value of `WWW-Authenticate` sent with 401 responses.
    fn auth_header(&self, ctx: &RequestContext) -> String;
}

/// Treats every caller as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousProvider;

impl UserProvider for AnonymousProvider {
    fn identify(&self, _ctx: &RequestContext) -> Identity {
        Identity::anonymous()
    }

    fn auth_header(&self, _ctx: &RequestContext) -> String {
        String::new()
    }
}

type Verifier = dyn Fn(&str, &str) -> Option<Roles> + Send + Sync;

/// HTTP Basic authentication with caller-supplied credential checking.
///
/// ```
/// use tessera_core::Roles;
/// use tessera_server::BasicAuthProvider;
///
/// let provider = BasicAuthProvider::new("slides", |user, password| {
///     (user == "foo" && password == "bar").then(|| Roles::from_iter(["AUTHED"]))
/// });
/// assert_eq!(provider.realm(), "slides");
/// ```
#[derive(Clone)]
pub struct BasicAuthProvider {
    realm: String,
    verify: Arc<Verifier>,
}

impl BasicAuthProvider {
    /// Creates a provider; `verify` returns the roles for valid credentials.
    pub fn new<F>(realm: impl Into<String>, verify: F) -> Self
    where
        F: Fn(&str, &str) -> Option<Roles> + Send + Sync + 'static,
    {
        Self {
            realm: realm.into(),
            verify: Arc::new(verify),
        }
    }

    /// The authentication realm.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    fn credentials(ctx: &RequestContext) -> Option<(String, String)> {
        let encoded = ctx.header(header::AUTHORIZATION)?.strip_prefix("Basic ")?;
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (user, password) = text.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }
}

impl std::fmt::Debug for BasicAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthProvider")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

impl UserProvider for BasicAuthProvider {
    fn identify(&self, ctx: &RequestContext) -> Identity {
        let Some((user, password)) = Self::credentials(ctx) else {
            return Identity::anonymous();
        };
        match (self.verify)(&user, &password) {
            Some(roles) => Identity {
                username: user,
                roles,
            },
            None => {
                tracing::debug!(user = %user, "Rejected basic credentials");
                Identity::anonymous()
            }
        }
    }

    fn auth_header(&self, _ctx: &RequestContext) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }
}

/// Chooses the language for a request.
pub trait LangProvider: Send + Sync + 'static {
    /// Returns a language tag. May set cookies through `ctx`.
    fn select(&self, ctx: &RequestContext) -> String;
}

/// Always selects the empty language.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLangProvider;

impl LangProvider for NoLangProvider {
    fn select(&self, _ctx: &RequestContext) -> String {
        String::new()
    }
}

/// Cookie name holding the preferred language.
pub const LANG_COOKIE: &str = "lang";

const LANG_COOKIE_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Picks a language from the `lang` cookie or `Accept-Language`.
///
/// A `lang` cookie wins outright. Otherwise the `Accept-Language` entries
/// present in the translation table are weighed: the first with quality 1
/// wins, else the highest quality. Entries with an unparsable quality are
/// skipped. The result falls back to the default and is stored in a
/// ten-year `lang` cookie.
#[derive(Debug, Clone)]
pub struct AcceptLanguageProvider {
    translations: Arc<Translations>,
    default_lang: String,
}

impl AcceptLanguageProvider {
    /// Creates a provider over a translation table.
    pub fn new(translations: Arc<Translations>, default_lang: impl Into<String>) -> Self {
        Self {
            translations,
            default_lang: default_lang.into(),
        }
    }

    // Same quality rules as `Accept`: the highest-weighted known tag wins,
    // ties keep header order, and zero never selects.
    fn from_header(&self, accept: &str) -> Option<String> {
        parse_accept(&accept.to_ascii_lowercase())
            .into_iter()
            .find(|entry| entry.quality > 0.0 && self.translations.has_lang(&entry.range))
            .map(|entry| entry.range)
    }
}

impl LangProvider for AcceptLanguageProvider {
    fn select(&self, ctx: &RequestContext) -> String {
        if let Some(lang) = ctx.cookie(LANG_COOKIE).filter(|l| !l.is_empty()) {
            return lang.to_string();
        }

        let lang = ctx
            .header(header::ACCEPT_LANGUAGE)
            .and_then(|accept| self.from_header(accept))
            .unwrap_or_else(|| self.default_lang.clone());

        ctx.set_cookie(
            &SetCookie::new(LANG_COOKIE, lang.clone())
                .path("/")
                .expires_in(LANG_COOKIE_TTL),
        );
        lang
    }
}
