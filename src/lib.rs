//! A small HTTP server framework.
//!
//! Routes are stored in a segment trie (`/User/:id`), each route holding an
//! ordered chain of handlers. Handlers return an [`Outcome`] telling the
//! dispatcher to answer, continue with the next handler, send a file, or
//! apply a structured [`Reply`]. Responses get a strong ETag and conditional
//! `304 Not Modified` handling automatically.
//!
//! ```rust,ignore
//! use routeway::{handler_fn, handlers, Request, Router, Routes, Server};
//!
//! let mut server = Server::new();
//! server.get("/health", "ok");
//!
//! let mut api = Router::new();
//! api.get("/User/:id", handler_fn(|req: Request| async move {
//!     format!("user {}", req.param("id").unwrap_or_default())
//! }));
//! server.route("/api", api);
//!
//! let running = server.listen(3000).await?;
//! running.close().await;
//! ```

pub mod config;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod net;
pub mod observability;
pub mod routing;
pub mod static_files;

pub use config::ServerConfig;
pub use handler::{
    handler_fn, BoxedHandler, Handler, HandlerError, HandlerResult, HandlerTree, IntoHandlers,
    IntoOutcome, Outcome, Reply, Status,
};
pub use http::{FieldValue, Headers, Request, RunningServer, Server, ServerError};
pub use lifecycle::Shutdown;
pub use routing::{Router, Routes};
pub use static_files::StaticDir;
