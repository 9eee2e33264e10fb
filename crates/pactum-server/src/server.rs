//! HTTP host.
//!
//! Serves a [`Router`] over HTTP/1.1 on Hyper and Tokio. For every request
//! the host:
//!
//! - matches the route (`404 NOT_FOUND` when nothing matches)
//! - reads the body under the size limit (`413 PAYLOAD_TOO_LARGE`)
//! - parses it as JSON (`400 INVALID_JSON`)
//! - parses the query string, folding repeated keys into arrays
//! - hands everything to [`dispatch`](crate::dispatch::dispatch) under the
//!   request timeout (`504 HANDLER_TIMEOUT`)
//!
//! # Example
//!
//! ```rust,ignore
//! use pactum_server::{Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new().with(get_user)?;
//!
//!     Server::builder()
//!         .http_addr("0.0.0.0:8080")
//!         .router(router)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{header, HeaderValue, Request, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use pactum_core::{ErrorCode, RawInput, RequestContext, RequestId, REQUEST_ID_HEADER};
use pactum_telemetry::metrics::InFlightGuard;

use crate::config::ServerConfig;
use crate::dispatch::{dispatch, ErrorResponse, HttpResponse};
use crate::router::{Router, RouterError};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Errors that stop the host.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address.
        addr: SocketAddr,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Any other I/O failure of the listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The Pactum HTTP host.
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
}

impl Server {
    /// Creates a server for `router`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServeError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServeError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServeError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        self.serve_listener(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's address cannot be read.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServeError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, routes = self.router.len(), "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();
        let stop = shutdown.recv();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let token = tracker.acquire();
                            let shutdown = shutdown.clone();

                            tokio::spawn(async move {
                                if let Err(e) = server.serve_connection(stream, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                                }
                                drop(token);
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                () = &mut stop => {
                    tracing::info!("shutdown signal received, stopping server");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        tokio::select! {
            () = tracker.wait_idle() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = tracker.active_connections(),
                    "shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn serve_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let io = TokioIo::new(stream);
        let server = Arc::clone(self);

        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                // Let the in-flight request finish, then close.
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    /// Handles one request.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(RequestId::parse)
            .unwrap_or_default();

        let mut response = self.respond(req, request_id).await;

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }

    async fn respond<B>(&self, req: Request<B>, request_id: RequestId) -> HttpResponse
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path().to_string();

        let Some(matched) = self.router.match_route(req.method(), &path) else {
            tracing::debug!(method = %req.method(), path = %path, "no route matched");
            return ErrorResponse::new(ErrorCode::NotFound)
                .with_message("Route not found")
                .into_response();
        };
        let (contract, params) = matched.into_parts();
        let _in_flight = InFlightGuard::new();

        let query = match parse_query(req.uri().query()) {
            Ok(query) => query,
            Err(e) => {
                return ErrorResponse::new(ErrorCode::ValidationError)
                    .with_data(json!({ "query": [format!("malformed query string: {e}")] }))
                    .into_response();
            }
        };

        let max_body = self.config.max_body_bytes();
        if declared_length(&req).is_some_and(|len| len > max_body as u64) {
            return ErrorResponse::new(ErrorCode::PayloadTooLarge).into_response();
        }

        let ctx = RequestContext::new(contract.method(), path)
            .with_request_id(request_id)
            .with_operation(contract.label())
            .with_headers(req.headers().clone());

        let work = async {
            let body = match read_json_body(req.into_body(), max_body).await {
                Ok(body) => body,
                Err(err) => return err.into_response(),
            };

            let raw = RawInput::new()
                .with_params(params)
                .with_query(query)
                .with_body(body);

            dispatch(&contract, raw, ctx).await.into_response()
        };

        match tokio::time::timeout(self.config.request_timeout(), work).await {
            Ok(response) => response,
            Err(_) => {
                tracing::warn!(
                    operation = %contract.label(),
                    request_id = %request_id,
                    "request timed out"
                );
                ErrorResponse::new(ErrorCode::HandlerTimeout).into_response()
            }
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("routes", &self.router.len())
            .finish()
    }
}

fn declared_length<B>(req: &Request<B>) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Reads the body and parses it as JSON. An empty body is `null`.
async fn read_json_body<B>(body: B, limit: usize) -> Result<Value, ErrorResponse>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(ErrorResponse::new(ErrorCode::PayloadTooLarge));
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to read request body");
            return Err(ErrorResponse::new(ErrorCode::InvalidJson)
                .with_message(format!("Failed to read request body: {e}")));
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        ErrorResponse::new(ErrorCode::InvalidJson).with_data(json!({ "reason": e.to_string() }))
    })
}

/// Parses a query string into an object of strings. A key given more than
/// once becomes an array of its values in order.
pub fn parse_query(query: Option<&str>) -> Result<Map<String, Value>, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or_default())?;

    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.get_mut(&key) {
            None => {
                map.insert(key, value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    Ok(map)
}

/// Builder for [`Server`].
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: crate::config::ServerConfigBuilder,
    router: Router,
}

impl ServerBuilder {
    /// Creates a builder with default configuration and no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.config = ServerConfig::builder()
            .http_addr(config.http_addr())
            .shutdown_timeout(config.shutdown_timeout())
            .request_timeout(config.request_timeout())
            .max_body_bytes(config.max_body_bytes());
        self
    }

    /// Sets the router.
    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Adds one contract to the router.
    ///
    /// # Errors
    ///
    /// See [`Router::add`].
    pub fn contract(mut self, contract: pactum_core::Contract) -> Result<Self, RouterError> {
        self.router.add(contract)?;
        Ok(self)
    }

    /// Sets the HTTP bind address.
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

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.request_timeout(timeout);
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config = self.config.max_body_bytes(limit);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server::new(self.config.build(), self.router)
    }
}
