//! In-memory client driving a [`Dispatcher`].

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;
use bytes::Bytes;
use http::Method;
use std::net::SocketAddr;
use std::sync::Arc;
use tessera_server::{Connection, Dispatcher};
use tokio_util::sync::CancellationToken;

/// Sends requests straight to a [`Dispatcher`], without a socket.
///
/// Responses to `HEAD` have their body removed, as the listener does.
///
/// ```ignore
/// use tessera_test::TestClient;
///
/// let client = TestClient::new(dispatcher);
/// client.get("/slides/1").accept("application/json").send().await
///     .assert_status(http::StatusCode::OK);
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient {
    dispatcher: Arc<Dispatcher>,
    default_headers: Vec<(String, String)>,
    remote_addr: Option<SocketAddr>,
}

impl TestClient {
    /// Wraps a dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_arc(Arc::new(dispatcher))
    }

    /// Wraps a shared dispatcher.
    pub fn from_arc(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            default_headers: Vec::new(),
            remote_addr: None,
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Sets the peer address reported to the dispatcher.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// The wrapped dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::get(uri))
    }

    /// Starts a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::post(uri))
    }

    /// Starts a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::put(uri))
    }

    /// Starts a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::delete(uri))
    }

    /// Starts a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequest::head(uri))
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Dispatches a built request.
    ///
    /// # Errors
    ///
    /// Fails if the response body cannot be read.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        self.send_with(request, CancellationToken::new()).await
    }

    async fn send_with(
        &self,
        request: TestRequest,
        disconnect: CancellationToken,
    ) -> Result<TestResponse, TestError> {
        let head = request.method == Method::HEAD;
        let conn = Connection {
            remote_addr: self.remote_addr,
            disconnect,
        };
        let response = self
            .dispatcher
            .dispatch_with(request.into_http_request(), conn)
            .await;
        let response = TestResponse::from_http(response).await?;
        Ok(if head { response.strip_body() } else { response })
    }
}

/// A request builder bound to a [`TestClient`].
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
    disconnect: CancellationToken,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, mut builder: TestRequestBuilder) -> Self {
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self {
            client,
            builder,
            disconnect: CancellationToken::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets `Accept`.
    #[must_use]
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept(accept);
        self
    }

    /// Sets `Accept-Language`.
    #[must_use]
    pub fn accept_language(mut self, languages: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept_language(languages);
        self
    }

    /// Sets `Content-Type`.
    #[must_use]
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Adds a cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Sets `Authorization: Basic` credentials.
    #[must_use]
    pub fn basic_auth(mut self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        self.builder = self.builder.basic_auth(username, password);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form body.
    #[must_use]
    pub fn form<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Marks the client as already gone when the request is dispatched.
    #[must_use]
    pub fn disconnected(self) -> Self {
        self.disconnect.cancel();
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build and read failures.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be built or the body cannot be read.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.send_with(request, self.disconnect).await
    }
}
