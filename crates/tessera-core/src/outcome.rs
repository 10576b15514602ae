//! The outcome of handling one request.

use serde::Serialize;
use std::fmt;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::fault::Fault;
use crate::media::MediaTypes;

/// A readable byte source passed through to the response body.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A success body.
///
/// Holds a JSON value so it can be encoded as JSON, rendered as a view model,
/// or written as plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity(serde_json::Value);

impl Entity {
    /// A plain string body.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::Value::String(text.into()))
    }

    /// Serializes any value into an entity.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self)
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// The plain textual form: strings verbatim, anything else as JSON text.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match &self.0 {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Value> for Entity {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl From<String> for Entity {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<&str> for Entity {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

/// The tagged result of a request.
///
/// Every request produces exactly one `Outcome`. A handler that has nothing to
/// return answers `None` instead, which the dispatcher turns into
/// [`Outcome::MethodNotAllowed`].
pub enum Outcome {
    /// 200 with a body.
    Ok(Entity),
    /// 204.
    NoContent,
    /// 301 to the given URI.
    MovedPermanently(String),
    /// 302 to the given URI.
    Found(String),
    /// 303 to the given URI.
    SeeOther(String),
    /// 307 to the given URI.
    TempRedirect(String),
    /// 400.
    BadRequest {
        /// Message used when no body is given.
        reason: String,
        /// Optional body.
        body: Option<Entity>,
    },
    /// 401 with a `WWW-Authenticate` challenge.
    Unauthorized {
        /// Value of `WWW-Authenticate`.
        auth_header: String,
        /// Optional body.
        body: Option<Entity>,
    },
    /// 403.
    Forbidden(Option<Entity>),
    /// 404.
    NotFound(Option<Entity>),
    /// 405 listing the supported verbs.
    MethodNotAllowed(Vec<String>),
    /// 406 listing the types that could have been produced.
    NotAcceptable(MediaTypes),
    /// 415.
    UnsupportedMediaType(Option<Entity>),
    /// 501.
    NotImplemented(Option<Entity>),
    /// 503, with `Retry-After` when `retry_secs` is not negative.
    ServiceUnavailable {
        /// Seconds before retrying; negative omits the header.
        retry_secs: i64,
        /// Optional body.
        body: Option<Entity>,
    },
    /// 500. Only `code` reaches the client.
    InternalError {
        /// `file:line:column` of the fault.
        location: String,
        /// Full fault message.
        reason: String,
        /// Code derived from `reason`.
        code: u32,
    },
    /// The client went away; nothing is written.
    ClientGone,
    /// Binary passthrough. 206 if the request had a `Range` header, else 200.
    Stream(ByteStream),
}

impl Outcome {
    /// 200 with `entity`.
    pub fn ok(entity: impl Into<Entity>) -> Self {
        Self::Ok(entity.into())
    }

    /// 200 with a text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Ok(Entity::text(text))
    }

    /// 200 with a serialized value, or 500 if serialization fails.
    #[track_caller]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match Entity::json(value) {
            Ok(entity) => Self::Ok(entity),
            Err(err) => Self::internal(err),
        }
    }

    /// 204.
    pub fn no_content() -> Self {
        Self::NoContent
    }

    /// 301.
    pub fn moved_permanently(uri: impl Into<String>) -> Self {
        Self::MovedPermanently(uri.into())
    }

    /// 302.
    pub fn found(uri: impl Into<String>) -> Self {
        Self::Found(uri.into())
    }

    /// 303.
    pub fn see_other(uri: impl Into<String>) -> Self {
        Self::SeeOther(uri.into())
    }

    /// 307.
    pub fn temp_redirect(uri: impl Into<String>) -> Self {
        Self::TempRedirect(uri.into())
    }

    /// 400 with a plain message.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
            body: None,
        }
    }

    /// 400 with a body.
    pub fn bad_request_with(reason: impl Into<String>, body: impl Into<Entity>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
            body: Some(body.into()),
        }
    }

    /// 401 with the given challenge.
    pub fn unauthorized(auth_header: impl Into<String>) -> Self {
        Self::Unauthorized {
            auth_header: auth_header.into(),
            body: None,
        }
    }

    /// 403.
    pub fn forbidden() -> Self {
        Self::Forbidden(None)
    }

    /// 404.
    pub fn not_found() -> Self {
        Self::NotFound(None)
    }

    /// 404 with a body.
    pub fn not_found_with(body: impl Into<Entity>) -> Self {
        Self::NotFound(Some(body.into()))
    }

    /// 415.
    pub fn unsupported_media_type() -> Self {
        Self::UnsupportedMediaType(None)
    }

    /// 501.
    pub fn not_implemented() -> Self {
        Self::NotImplemented(None)
    }

    /// 503.
    pub fn service_unavailable(retry_secs: i64) -> Self {
        Self::ServiceUnavailable {
            retry_secs,
            body: None,
        }
    }

    /// 500 for an error, located at the caller.
    ///
    /// ```
    /// use tessera_core::Outcome;
    ///
    /// let outcome = Outcome::internal("disk full");
    /// match outcome {
    ///     Outcome::InternalError { location, reason, .. } => {
    ///         assert_eq!(reason, "disk full");
    ///         assert!(!location.is_empty());
    ///     }
    ///     _ => unreachable!(),
    /// }
    /// ```
    #[track_caller]
    pub fn internal(err: impl fmt::Display) -> Self {
        Fault::here(err.to_string()).into()
    }

    /// Marks the request as abandoned by the client.
    pub fn client_gone() -> Self {
        Self::ClientGone
    }

    /// Streams `reader` as the body.
    pub fn stream(reader: impl AsyncRead + Send + 'static) -> Self {
        Self::Stream(Box::pin(reader))
    }

    /// Short snake_case name of the variant, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::NoContent => "no_content",
            Self::MovedPermanently(_) => "moved_permanently",
            Self::Found(_) => "found",
            Self::SeeOther(_) => "see_other",
            Self::TempRedirect(_) => "temp_redirect",
            Self::BadRequest { .. } => "bad_request",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::NotAcceptable(_) => "not_acceptable",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::NotImplemented(_) => "not_implemented",
            Self::ServiceUnavailable { .. } => "service_unavailable",
            Self::InternalError { .. } => "internal_error",
            Self::ClientGone => "client_gone",
            Self::Stream(_) => "stream",
        }
    }
}

impl From<Fault> for Outcome {
    fn from(fault: Fault) -> Self {
        Self::InternalError {
            location: fault.location,
            reason: fault.reason,
            code: fault.code,
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(e) => f.debug_tuple("Ok").field(e).finish(),
            Self::NoContent => f.write_str("NoContent"),
            Self::MovedPermanently(u) => f.debug_tuple("MovedPermanently").field(u).finish(),
            Self::Found(u) => f.debug_tuple("Found").field(u).finish(),
            Self::SeeOther(u) => f.debug_tuple("SeeOther").field(u).finish(),
            Self::TempRedirect(u) => f.debug_tuple("TempRedirect").field(u).finish(),
            Self::BadRequest { reason, body } => f
                .debug_struct("BadRequest")
                .field("reason", reason)
                .field("body", body)
                .finish(),
            Self::Unauthorized { auth_header, body } => f
                .debug_struct("Unauthorized")
                .field("auth_header", auth_header)
                .field("body", body)
                .finish(),
            Self::Forbidden(b) => f.debug_tuple("Forbidden").field(b).finish(),
            Self::NotFound(b) => f.debug_tuple("NotFound").field(b).finish(),
            Self::MethodNotAllowed(m) => f.debug_tuple("MethodNotAllowed").field(m).finish(),
            Self::NotAcceptable(t) => f.debug_tuple("NotAcceptable").field(t).finish(),
            Self::UnsupportedMediaType(b) => {
                f.debug_tuple("UnsupportedMediaType").field(b).finish()
            }
            Self::NotImplemented(b) => f.debug_tuple("NotImplemented").field(b).finish(),
            Self::ServiceUnavailable { retry_secs, body } => f
                .debug_struct("ServiceUnavailable")
                .field("retry_secs", retry_secs)
                .field("body", body)
                .finish(),
            Self::InternalError {
                location,
                reason,
                code,
            } => f
                .debug_struct("InternalError")
                .field("location", location)
                .field("reason", reason)
                .field("code", code)
                .finish(),
            Self::ClientGone => f.write_str("ClientGone"),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
