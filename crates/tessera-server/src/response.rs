//! Mapping an [`Outcome`] to a wire response.

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::header::{self, HeaderMap, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tessera_core::{Entity, Fault, MediaType, Outcome};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::settings::Settings;
use crate::views::ViewEngine;

/// Response body type.
pub type ResponseBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Response type produced by the dispatcher.
pub type HttpResponse = Response<ResponseBody>;

/// Status recorded when the client left before a response was written.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

pub(crate) fn full(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub(crate) fn empty() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

pub(crate) fn stream(reader: impl AsyncRead + Send + 'static) -> ResponseBody {
    StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed_unsync()
}

pub(crate) fn respond(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> HttpResponse {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// A plain text response.
pub(crate) fn plain(status: StatusCode, mut headers: HeaderMap, text: String) -> HttpResponse {
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    respond(status, headers, full(text))
}

fn content_type(media_type: &MediaType) -> HeaderValue {
    HeaderValue::from_str(media_type.as_str())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// What the writer needs to know about the request besides the outcome.
pub(crate) struct Rendering<'a> {
    /// Negotiated type, if negotiation ran.
    pub chosen_type: Option<&'a MediaType>,
    /// View bound to the verb.
    pub view: Option<&'a str>,
    /// Selected language.
    pub lang: &'a str,
    /// The request carried a `Range` header.
    pub partial: bool,
    /// Headers set while handling the request.
    pub headers: HeaderMap,
}

impl Rendering<'_> {
    fn wants_html(&self) -> bool {
        self.chosen_type.is_some_and(MediaType::is_html)
    }
}

/// Serializes outcomes.
///
/// Bodies are encoded by negotiated type: JSON for `application/json` and
/// `+json` types, the bound view for HTML, and the plain textual form
/// otherwise. Fault details never reach the client; only the code does.
#[derive(Clone)]
pub struct ResponseWriter {
    views: Arc<dyn ViewEngine>,
    settings: Arc<Settings>,
}

impl ResponseWriter {
    /// Creates a writer.
    pub fn new(views: Arc<dyn ViewEngine>, settings: Arc<Settings>) -> Self {
        Self { views, settings }
    }

    /// The writer settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub(crate) async fn write(&self, outcome: Outcome, r: Rendering<'_>) -> HttpResponse {
        match outcome {
            Outcome::Ok(entity) => self.encode(StatusCode::OK, &entity, r),
            Outcome::NoContent => respond(StatusCode::NO_CONTENT, r.headers, empty()),
            Outcome::MovedPermanently(uri) => {
                self.redirect(StatusCode::MOVED_PERMANENTLY, &uri, true, r)
            }
            Outcome::Found(uri) => self.redirect(StatusCode::FOUND, &uri, true, r),
            Outcome::SeeOther(uri) => self.redirect(StatusCode::SEE_OTHER, &uri, true, r),
            Outcome::TempRedirect(uri) => {
                self.redirect(StatusCode::TEMPORARY_REDIRECT, &uri, false, r)
            }
            Outcome::BadRequest { reason, body } => match body {
                Some(entity) => self.encode(StatusCode::BAD_REQUEST, &entity, r),
                None => plain(StatusCode::BAD_REQUEST, r.headers, reason),
            },
            Outcome::Unauthorized { auth_header, body } => {
                let mut r = r;
                match HeaderValue::from_str(&auth_header) {
                    Ok(value) => {
                        r.headers.insert(header::WWW_AUTHENTICATE, value);
                    }
                    Err(_) => tracing::warn!(
                        auth_header = %auth_header,
                        "Dropping invalid WWW-Authenticate value"
                    ),
                }
                let page = self.settings.unauthorized_page.as_deref();
                self.with_page(StatusCode::UNAUTHORIZED, body, page, r).await
            }
            Outcome::Forbidden(body) => {
                let page = self.settings.forbidden_page.as_deref();
                self.with_page(StatusCode::FORBIDDEN, body, page, r).await
            }
            Outcome::NotFound(body) => self.status_body(StatusCode::NOT_FOUND, body, r),
            Outcome::MethodNotAllowed(allowed) => {
                let mut headers = r.headers;
                if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
                    headers.insert(header::ALLOW, value);
                }
                plain(
                    StatusCode::METHOD_NOT_ALLOWED,
                    headers,
                    "method not allowed".to_string(),
                )
            }
            Outcome::NotAcceptable(produced) => plain(
                StatusCode::NOT_ACCEPTABLE,
                r.headers,
                format!("{produced}\n"),
            ),
            Outcome::UnsupportedMediaType(body) => {
                self.status_body(StatusCode::UNSUPPORTED_MEDIA_TYPE, body, r)
            }
            Outcome::NotImplemented(body) => self.status_body(StatusCode::NOT_IMPLEMENTED, body, r),
            Outcome::ServiceUnavailable { retry_secs, body } => {
                let mut r = r;
                if retry_secs >= 0 {
                    r.headers
                        .insert(header::RETRY_AFTER, HeaderValue::from(retry_secs));
                }
                self.status_body(StatusCode::SERVICE_UNAVAILABLE, body, r)
            }
            Outcome::InternalError { code, .. } => self.internal(code, r),
            Outcome::ClientGone => {
                let status = StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                    .unwrap_or(StatusCode::BAD_REQUEST);
                respond(status, r.headers, empty())
            }
            Outcome::Stream(reader) => {
                let status = if r.partial {
                    StatusCode::PARTIAL_CONTENT
                } else {
                    StatusCode::OK
                };
                let mut headers = r.headers;
                if let Some(t) = r.chosen_type {
                    headers.insert(header::CONTENT_TYPE, content_type(t));
                }
                respond(status, headers, stream(reader))
            }
        }
    }

    fn encode(&self, status: StatusCode, entity: &Entity, r: Rendering<'_>) -> HttpResponse {
        let Some(chosen) = r.chosen_type else {
            return plain(status, r.headers, entity.to_plain_text());
        };

        let body = if chosen.is_json() {
            entity.value().to_string()
        } else if let (true, Some(view)) = (chosen.is_html(), r.view) {
            match self.views.render(view, entity.value(), r.lang) {
                Ok(html) => html,
                Err(err) => {
                    let fault = Fault::here(err.to_string());
                    tracing::error!(
                        error.location = %fault.location,
                        error.code = fault.code,
                        error.message = %fault.reason,
                        "View rendering failed"
                    );
                    return self.internal(fault.code, r);
                }
            }
        } else {
            entity.to_plain_text()
        };

        let mut headers = r.headers;
        headers.insert(header::CONTENT_TYPE, content_type(chosen));
        respond(status, headers, full(body))
    }

    fn status_body(&self, status: StatusCode, body: Option<Entity>, r: Rendering<'_>) -> HttpResponse {
        match body {
            Some(entity) => self.encode(status, &entity, r),
            None => plain(status, r.headers, status_message(status)),
        }
    }

    async fn with_page(
        &self,
        status: StatusCode,
        body: Option<Entity>,
        page: Option<&Path>,
        r: Rendering<'_>,
    ) -> HttpResponse {
        if body.is_none() && r.wants_html() {
            if let Some(path) = page {
                match tokio::fs::File::open(path).await {
                    Ok(file) => {
                        let mut headers = r.headers;
                        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
                        return respond(status, headers, stream(file));
                    }
                    Err(err) => tracing::warn!(
                        page = %path.display(),
                        error = %err,
                        "Fallback page unavailable"
                    ),
                }
            }
        }
        self.status_body(status, body, r)
    }

    fn redirect(&self, status: StatusCode, uri: &str, with_body: bool, r: Rendering<'_>) -> HttpResponse {
        let Ok(location) = HeaderValue::from_str(uri) else {
            let fault = Fault::here(format!("invalid redirect location {uri:?}"));
            tracing::error!(
                error.location = %fault.location,
                error.code = fault.code,
                error.message = %fault.reason,
                "Redirect failed"
            );
            return self.internal(fault.code, r);
        };
        let mut headers = r.headers;
        headers.insert(header::LOCATION, location);
        if with_body {
            plain(status, headers, format!("{uri}\n"))
        } else {
            respond(status, headers, empty())
        }
    }

    fn internal(&self, code: u32, r: Rendering<'_>) -> HttpResponse {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let mut headers = r.headers;
        if let Some(view) = &self.settings.error_template {
            match self.views.render(view, &json!({ "code": code }), r.lang) {
                Ok(html) => {
                    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_HTML));
                    return respond(status, headers, full(html));
                }
                Err(err) => tracing::error!(error = %err, "Error template failed"),
            }
        }
        plain(status, headers, format!("internal server error: {code}"))
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("error")
        .to_ascii_lowercase()
}
