//! Request handler pipeline.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     single handlers, arrays, vectors, handlers![..] nested to any depth
//!     → tree.rs (HandlerTree::flatten)
//!     → ordered Vec<BoxedHandler> stored per (method, route)
//!
//! Execution (one exchange):
//!     Request → Handler::call → IntoOutcome
//!     → outcome.rs (Outcome: Text | Empty | Continue | File | Reply)
//!     → interpreted by the dispatcher (end, continue, send file, apply reply)
//! ```
//!
//! # Design Decisions
//! - Handlers receive a cheap clone of the `Request`, never the `Response`:
//!   everything a handler wants to send travels through its `Outcome`
//! - Fixed values (`"text"`, `Outcome`, `Reply`) are handlers themselves
//! - Closures are adapted explicitly with `handler_fn`

pub mod error;
pub mod outcome;
pub mod tree;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::Request;

pub use error::HandlerError;
pub use outcome::{IntoOutcome, Outcome, Reply, Status};
pub use tree::{HandlerTree, IntoHandlers};

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of running a single handler.
pub type HandlerResult = Result<Outcome, HandlerError>;

/// A shared, type-erased handler as stored in route chains.
pub type BoxedHandler = Arc<dyn Handler>;

/// One step of a handler chain.
pub trait Handler: Send + Sync + 'static {
    /// Run the handler against the request of the current exchange.
    fn call(&self, req: Request) -> BoxFuture<'static, HandlerResult>;
}

impl Handler for Arc<dyn Handler> {
    fn call(&self, req: Request) -> BoxFuture<'static, HandlerResult> {
        (**self).call(req)
    }
}

impl Handler for Outcome {
    fn call(&self, _req: Request) -> BoxFuture<'static, HandlerResult> {
        let outcome = self.clone();
        Box::pin(async move { Ok(outcome) })
    }
}

impl Handler for Reply {
    fn call(&self, _req: Request) -> BoxFuture<'static, HandlerResult> {
        let reply = self.clone();
        Box::pin(async move { Ok(Outcome::Reply(reply)) })
    }
}

impl Handler for &'static str {
    fn call(&self, _req: Request) -> BoxFuture<'static, HandlerResult> {
        let text = *self;
        Box::pin(async move { Ok(Outcome::Text(text.to_owned())) })
    }
}

impl Handler for String {
    fn call(&self, _req: Request) -> BoxFuture<'static, HandlerResult> {
        let text = self.clone();
        Box::pin(async move { Ok(Outcome::Text(text)) })
    }
}

/// Handler backed by an async closure. Created with [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Adapt an async closure into a [`Handler`].
///
/// The closure may return anything implementing [`IntoOutcome`]: text, `bool`,
/// `()`, a [`Reply`], an [`Outcome`], or a `Result` of those.
///
/// ```rust,ignore
/// router.get("/User/:id", handler_fn(|req: Request| async move {
///     format!("user {}", req.param("id").unwrap_or_default())
/// }));
/// ```
pub fn handler_fn<F, Fut, R>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome,
{
    HandlerFn { f }
}

impl<F, Fut, R> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome,
{
    fn call(&self, req: Request) -> BoxFuture<'static, HandlerResult> {
        let fut = (self.f)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_text_handler_returns_text() {
        let outcome = "Hello world!".call(Request::empty()).await.unwrap();
        assert_eq!(outcome, Outcome::Text("Hello world!".into()));
    }

    #[tokio::test]
    async fn fixed_outcome_handler_is_reusable() {
        let handler = Outcome::Continue;
        assert_eq!(handler.call(Request::empty()).await.unwrap(), Outcome::Continue);
        assert_eq!(handler.call(Request::empty()).await.unwrap(), Outcome::Continue);
    }

    #[tokio::test]
    async fn closure_handler_converts_return_value() {
        let handler = handler_fn(|_req: Request| async { true });
        assert_eq!(handler.call(Request::empty()).await.unwrap(), Outcome::Continue);

        let handler = handler_fn(|_req: Request| async { Err::<(), _>(HandlerError::other("boom")) });
        let err = handler.call(Request::empty()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
