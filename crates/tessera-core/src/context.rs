//! Per-request context.
//!
//! The [`RequestContext`] is built by the dispatcher for each request and
//! moved into the fresh resource instance. It gives handlers read access to
//! the request and a shared handle on the response headers.

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tessera_router::PathParams;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::media::MediaType;
use crate::permission::Roles;

/// A unique identifier for each request, using UUID v7.
///
/// ```
/// use tessera_core::RequestId;
///
/// let a = RequestId::new();
/// let b = RequestId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response headers shared between a handler and the response writer.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders(Arc<Mutex<HeaderMap>>);

impl ResponseHeaders {
    /// Creates an empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping earlier values.
    pub fn append(&self, name: HeaderName, value: HeaderValue) {
        self.0.lock().append(name, value);
    }

    /// Sets a header, replacing earlier values.
    pub fn insert(&self, name: HeaderName, value: HeaderValue) {
        self.0.lock().insert(name, value);
    }

    /// Returns a copy of the current headers.
    #[must_use]
    pub fn snapshot(&self) -> HeaderMap {
        self.0.lock().clone()
    }
}

/// A `Set-Cookie` value.
///
/// ```
/// use tessera_core::SetCookie;
///
/// let cookie = SetCookie::new("lang", "de").path("/");
/// assert_eq!(cookie.to_string(), "lang=de; Path=/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<String>,
    expires: Option<SystemTime>,
    http_only: bool,
    secure: bool,
}

impl SetCookie {
    /// Creates a session cookie.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            expires: None,
            http_only: false,
            secure: false,
        }
    }

    /// Sets the `Path` attribute.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets `Expires` to an absolute time.
    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    /// Sets `Expires` to `ttl` from now.
    pub fn expires_in(self, ttl: Duration) -> Self {
        self.expires(SystemTime::now() + ttl)
    }

    /// Sets `HttpOnly`.
    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    /// Sets `Secure`.
    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(at) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(at))?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

/// Per-request state handed to a resource instance.
///
/// Form data is the query string merged with an
/// `application/x-www-form-urlencoded` body, parsed before dispatch.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use http::{HeaderMap, Method, Uri};
/// use tessera_core::RequestContext;
///
/// let uri: Uri = "/slides?page=2&tag=a&tag=b".parse().unwrap();
/// let ctx = RequestContext::new(Method::GET, uri, HeaderMap::new(), Bytes::new());
///
/// assert_eq!(ctx.param("page"), Some("2"));
/// assert_eq!(ctx.param_array("tag"), vec!["a", "b"]);
/// assert!(ctx.username().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    form: Vec<(String, String)>,
    remote_addr: Option<SocketAddr>,
    username: String,
    roles: Roles,
    path_params: PathParams,
    chosen_type: Option<MediaType>,
    content_type: Option<MediaType>,
    lang: String,
    response_headers: ResponseHeaders,
    disconnect: CancellationToken,
}

impl RequestContext {
    /// Builds a context from the request parts and parses form data.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(MediaType::from_header);

        let mut form = parse_form(uri.query().unwrap_or_default().as_bytes());
        if content_type
            .as_ref()
            .is_some_and(|t| t.as_str().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        {
            form.extend(parse_form(&body));
        }

        // Invalid UTF-8 after decoding keeps the path as sent.
        let path = urlencoding::decode(uri.path())
            .map_or_else(|_| uri.path().to_string(), std::borrow::Cow::into_owned);

        Self {
            request_id: RequestId::new(),
            method,
            uri,
            path,
            headers,
            body,
            form,
            remote_addr: None,
            username: String::new(),
            roles: Roles::new(),
            path_params: PathParams::new(),
            chosen_type: None,
            content_type,
            lang: String::new(),
            response_headers: ResponseHeaders::new(),
            disconnect: CancellationToken::new(),
        }
    }

    /// Sets the peer address.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Uses an externally owned disconnect token.
    pub fn with_disconnect_token(mut self, token: CancellationToken) -> Self {
        self.disconnect = token;
        self
    }

    /// Records the caller. An empty `username` is anonymous.
    pub fn set_identity(&mut self, username: impl Into<String>, roles: Roles) {
        self.username = username.into();
        self.roles = roles;
    }

    /// Records the parameters captured from the path.
    pub fn set_path_params(&mut self, params: PathParams) {
        self.path_params = params;
    }

    /// Records the negotiated response type.
    pub fn set_chosen_type(&mut self, media_type: Option<MediaType>) {
        self.chosen_type = media_type;
    }

    /// Records the selected language.
    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    /// Request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// HTTP verb.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Percent-decoded request path. Routes match against this.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request path as it arrived on the wire.
    #[must_use]
    pub fn raw_path(&self) -> &str {
        self.uri.path()
    }

    /// Peer address, when known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Authenticated user name, empty when anonymous.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns `true` if the caller is anonymous.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// Caller roles.
    #[must_use]
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Negotiated response type, if negotiation ran.
    #[must_use]
    pub fn chosen_type(&self) -> Option<&MediaType> {
        self.chosen_type.as_ref()
    }

    /// Request `Content-Type` without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// Selected language tag.
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// First form value for `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every form value for `name`, in order.
    #[must_use]
    pub fn param_array(&self, name: &str) -> Vec<&str> {
        self.form
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Path parameter captured by the route, empty if the segment was absent.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// All path parameters.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// First value of a request header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a request cookie.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim() == name)
            .map(|(_, v)| v.trim())
    }

    /// Raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Appends a response header.
    pub fn add_header(&self, name: HeaderName, value: HeaderValue) {
        self.response_headers.append(name, value);
    }

    /// Adds a `Set-Cookie` response header.
    pub fn set_cookie(&self, cookie: &SetCookie) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => self.response_headers.append(header::SET_COOKIE, value),
            Err(_) => tracing::warn!(cookie = %cookie, "Dropping cookie with invalid characters"),
        }
    }

    /// Handle on the response headers.
    #[must_use]
    pub fn response_headers(&self) -> &ResponseHeaders {
        &self.response_headers
    }

    /// The token cancelled when the client disconnects.
    #[must_use]
    pub fn disconnect_token(&self) -> &CancellationToken {
        &self.disconnect
    }

    /// Completes when the client disconnects.
    ///
    /// Handlers waiting on something slow race their wait against this and
    /// return [`Outcome::ClientGone`](crate::Outcome::ClientGone) when it wins.
    pub fn client_gone(&self) -> WaitForCancellationFuture<'_> {
        self.disconnect.cancelled()
    }
}

fn parse_form(raw: &[u8]) -> Vec<(String, String)> {
    if raw.is_empty() {
        return Vec::new();
    }
    serde_urlencoded::from_bytes(raw).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "Ignoring malformed form data");
        Vec::new()
    })
}
