//! HTTP server: registration, listening and shutdown.
//!
//! # Responsibilities
//! - Own the top-level router and the ordered mount table
//! - Bind the listener and run the accept loop
//! - Serve each connection with HTTP/1.1 and HTTP/2 via hyper
//! - Wire up per-connection layers (request id, trace span)
//! - Track open connections so `close()` can destroy them
//!
//! # Design Decisions
//! - `listen` consumes the server: routes are frozen behind an `Arc`
//!   before the first connection is accepted
//! - `close()` stops accepting, then drops every open connection without
//!   waiting for in-flight chains

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::dispatch::{DispatchService, Dispatcher};
use crate::config::ServerConfig;
use crate::handler::IntoHandlers;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::observability::tracing::request_span;
use crate::routing::{Mounts, RouteMatch, Router, Routes};

/// Pause after a failed accept (e.g. too many open files).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Errors starting a server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An HTTP server under construction.
///
/// Register routes through [`Routes`], mount routers with
/// [`Server::route`], then start it with [`Server::listen`].
#[derive(Debug, Default)]
pub struct Server {
    router: Router,
    mounts: Mounts,
    config: ServerConfig,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mount `router` under `prefix`.
    ///
    /// Mounts are consulted in registration order after the server's own
    /// routes; mounting the same prefix again replaces the router.
    pub fn route(&mut self, prefix: impl Into<String>, router: Router) -> &mut Self {
        let prefix = prefix.into();
        tracing::debug!(prefix = %prefix, "Router mounted");
        self.mounts.insert(prefix, router);
        self
    }

    /// Resolve a request the way the running server would.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.router
            .find(method, path)
            .or_else(|| self.mounts.find(method, path))
    }

    /// Bind `listener.host:port` and start serving.
    pub async fn listen(self, port: u16) -> Result<RunningServer, ServerError> {
        let listener = Listener::bind(
            &self.config.listener.host,
            port,
            self.config.listener.max_connections,
        )
        .await?;
        self.start(listener)
    }

    /// Start serving on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<RunningServer, ServerError> {
        let listener = Listener::from_tokio(listener, self.config.listener.max_connections)?;
        self.start(listener)
    }

    fn start(self, listener: Listener) -> Result<RunningServer, ServerError> {
        let local_addr = listener.local_addr()?;
        let mounts: Vec<String> = self.mounts.prefixes().map(str::to_owned).collect();
        let dispatcher = Arc::new(Dispatcher::new(
            self.router,
            self.mounts,
            self.config.limits.max_body_bytes,
        ));

        let shutdown = Shutdown::new();
        let connections = ConnectionTracker::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            dispatcher,
            connections.clone(),
            shutdown.subscribe(),
        ));

        tracing::info!(address = %local_addr, mounts = ?mounts, "HTTP server started");

        Ok(RunningServer {
            local_addr,
            shutdown,
            connections,
            accept_task,
        })
    }
}

impl Routes for Server {
    fn on(&mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.router.on(method, path, handlers);
        self
    }

    fn middleware(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.router.middleware(handlers);
        self
    }
}

/// Handle to a server that is accepting connections.
///
/// Dropping the handle without calling [`RunningServer::close`] stops the
/// accept loop but leaves open connections running until they finish.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    connections: ConnectionTracker,
    accept_task: JoinHandle<()>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.connections.open_count()
    }

    /// Stop accepting and destroy every open connection.
    pub async fn close(self) {
        self.shutdown.trigger();
        if let Err(e) = self.accept_task.await {
            tracing::error!(error = %e, "Accept loop ended abnormally");
        }

        let destroyed = self.connections.destroy_all();
        tracing::info!(
            address = %self.local_addr,
            connections = destroyed,
            "HTTP server closed"
        );
    }
}

async fn accept_loop(
    listener: Listener,
    dispatcher: Arc<Dispatcher>,
    connections: ConnectionTracker,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer, permit)) => {
                    let guard = connections.track();
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        permit,
                        guard,
                        Arc::clone(&dispatcher),
                    ));
                }
                Err(ListenerError::Closed) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },
        }
    }

    tracing::debug!("Accept loop stopped");
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    _permit: ConnectionPermit,
    guard: ConnectionGuard,
    dispatcher: Arc<Dispatcher>,
) {
    let connection_id = guard.id();
    tracing::debug!(connection_id = %connection_id, peer_addr = %peer, "Serving connection");

    let service = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<Incoming>| {
            request_span(req)
        }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .service(DispatchService::new(dispatcher));

    let builder = auto::Builder::new(TokioExecutor::new());
    let connection = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));

    tokio::select! {
        result = connection => {
            if let Err(e) = result {
                tracing::debug!(connection_id = %connection_id, error = %e, "Connection ended with error");
            }
        }
        _ = guard.killed() => {
            tracing::debug!(connection_id = %connection_id, "Connection destroyed");
        }
    }
}
