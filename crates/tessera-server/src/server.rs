//! The HTTP/1.1 listener.
//!
//! Accepts connections, reads each request body under the configured
//! timeout and size limit, and hands the request to the [`Dispatcher`] on
//! its own task. A client that disconnects while its request is in flight
//! has its context's disconnect token cancelled.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_server::{Dispatcher, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::builder().build()?;
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .build(dispatcher)
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tessera_core::Fault;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::dispatcher::{Connection, Dispatcher};
use crate::response::{plain, HttpResponse};
use crate::shutdown::ShutdownSignal;

/// Errors starting the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured address does not parse.
    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },

    /// Binding the listener failed.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The parsed address.
        addr: SocketAddr,
        /// I/O failure.
        source: std::io::Error,
    },

    /// Reading the bound address failed.
    #[error("listener error: {0}")]
    Listener(#[source] std::io::Error),
}

/// The Tessera HTTP server.
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Creates a server for `dispatcher`.
    #[must_use]
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Creates a server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Listener configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The dispatcher serving requests.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and runs until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                source,
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local = listener.local_addr().map_err(ServerError::Listener)?;
        tracing::info!(addr = %local, routes = self.dispatcher.route_count(), "Server listening");

        let server = Arc::new(self);
        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let shutdown = shutdown.clone();
                        tracker.spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(remote_addr = %remote_addr, error = %e, "Connection error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, stopping server");
                    break;
                }
            }
        }

        tracker.close();
        let timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout_ms = timeout.as_millis(),
            connections = tracker.len(),
            "Waiting for connections to close"
        );

        if tokio::time::timeout(timeout, tracker.wait()).await.is_err() {
            tracing::warn!(
                connections = tracker.len(),
                "Shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(req, remote_addr).await }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<HttpResponse, Infallible> {
        let (parts, body) = req.into_parts();

        let body = match read_body(
            body,
            self.config.request_timeout(),
            self.config.max_body_bytes(),
        )
        .await
        {
            Ok(body) => body,
            Err(response) => return Ok(response),
        };

        let disconnect = CancellationToken::new();
        let guard = disconnect.clone().drop_guard();
        let conn = Connection {
            remote_addr: Some(remote_addr),
            disconnect,
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let request = Request::from_parts(parts, body);
        let task = tokio::spawn(async move { dispatcher.dispatch_with(request, conn).await });

        let response = match task.await {
            Ok(response) => response,
            Err(e) if e.is_panic() => {
                let fault = Fault::from_remote_panic(e.into_panic());
                tracing::error!(
                    error.location = %fault.location,
                    error.code = fault.code,
                    error.message = %fault.reason,
                    "Dispatch fault"
                );
                internal_error(fault.code)
            }
            Err(e) => {
                tracing::error!(error = %e, "Dispatch task failed");
                internal_error(0)
            }
        };

        guard.disarm();
        Ok(response)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Collects a request body, answering 408, 413 or 400 on failure.
async fn read_body(
    body: Incoming,
    timeout: Duration,
    limit: usize,
) -> Result<Bytes, HttpResponse> {
    match tokio::time::timeout(timeout, Limited::new(body, limit).collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::info!(limit, "Request body too large");
            Err(plain(
                StatusCode::PAYLOAD_TOO_LARGE,
                HeaderMap::new(),
                "payload too large".to_string(),
            ))
        }
        Ok(Err(e)) => {
            tracing::info!(error = %e, "Failed to read request body");
            Err(plain(
                StatusCode::BAD_REQUEST,
                HeaderMap::new(),
                "bad request".to_string(),
            ))
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis(), "Request body read timed out");
            Err(plain(
                StatusCode::REQUEST_TIMEOUT,
                HeaderMap::new(),
                "request timeout".to_string(),
            ))
        }
    }
}

fn internal_error(code: u32) -> HttpResponse {
    plain(
        StatusCode::INTERNAL_SERVER_ERROR,
        HeaderMap::new(),
        format!("internal server error: {code}"),
    )
}

/// Builder for [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: ServerConfigBuilder,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config = self.config.http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.shutdown_timeout(timeout);
        self
    }

    /// Sets the body read timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.request_timeout(timeout);
        self
    }

    /// Sets the body size limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config = self.config.max_body_bytes(limit);
        self
    }

    /// Builds a server for `dispatcher`.
    #[must_use]
    pub fn build(self, dispatcher: Dispatcher) -> Server {
        Server::new(self.config.build(), dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Get, Post, Resource, Route};
    use tessera_core::{Outcome, RequestContext};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[derive(Clone)]
    struct Hello {
        ctx: Option<RequestContext>,
    }

    impl Resource for Hello {
        fn instantiate(&self, ctx: RequestContext) -> Self {
            Self { ctx: Some(ctx) }
        }
    }

    impl Get for Hello {
        async fn get(&mut self) -> Option<Outcome> {
            Some(Outcome::text("hello"))
        }
    }

    impl Post for Hello {
        async fn post(&mut self) -> Option<Outcome> {
            let len = self.ctx.as_ref()?.body().len();
            Some(Outcome::text(format!("{len} bytes")))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::builder()
            .route(Route::new("/hello", Hello { ctx: None }).get().post())
            .build()
            .unwrap()
    }

    async fn exchange(addr: SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw.as_bytes()).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    async fn start(server: Server) -> (SocketAddr, ShutdownSignal, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            server.serve(listener, signal).await.unwrap();
        });
        (addr, shutdown, handle)
    }

    #[test]
    fn test_builder() {
        let server = Server::builder()
            .http_addr("127.0.0.1:9090")
            .shutdown_timeout(Duration::from_secs(60))
            .max_body_bytes(1024)
            .build(dispatcher());
        assert_eq!(server.config().http_addr(), "127.0.0.1:9090");
        assert_eq!(server.config().shutdown_timeout(), Duration::from_secs(60));
        assert_eq!(server.config().max_body_bytes(), 1024);
    }

    #[test]
    fn test_error_display() {
        let err = ServerError::InvalidAddress {
            addr: "nope".into(),
            source: "nope".parse::<SocketAddr>().unwrap_err(),
        };
        assert!(err.to_string().starts_with("invalid address 'nope'"));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let server = Server::builder().http_addr("not-an-address").build(dispatcher());
        let result = server.run_with_shutdown(ShutdownSignal::new()).await;
        assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_serves_and_shuts_down() {
        let server = Server::builder()
            .shutdown_timeout(Duration::from_millis(100))
            .build(dispatcher());
        let (addr, shutdown, handle) = start(server).await;

        let reply = exchange(
            addr,
            "GET /hello HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
        assert!(reply.ends_with("hello"), "{reply}");

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_head_has_no_body() {
        let (addr, shutdown, _) = start(Server::builder().build(dispatcher())).await;
        let reply = exchange(
            addr,
            "HEAD /hello HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
        assert!(reply.ends_with("\r\n\r\n"), "{reply}");
        shutdown.trigger();
    }

    #[tokio::test]
    async fn test_body_limit() {
        let server = Server::builder().max_body_bytes(4).build(dispatcher());
        let (addr, shutdown, _) = start(server).await;

        let reply = exchange(
            addr,
            "POST /hello HTTP/1.1\r\nHost: test\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
        )
        .await;
        assert!(reply.starts_with("HTTP/1.1 413"), "{reply}");

        let reply = exchange(
            addr,
            "POST /hello HTTP/1.1\r\nHost: test\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc",
        )
        .await;
        assert!(reply.ends_with("3 bytes"), "{reply}");
        shutdown.trigger();
    }
}
