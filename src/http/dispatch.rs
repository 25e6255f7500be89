//! Request dispatch: route resolution and handler chain execution.
//!
//! # Data Flow
//! ```text
//! http::Request
//!     → resolve (server router, then mounts in order)
//!         miss → 404, empty body
//!     → spawn chain task with Request + Response
//!     → await response head (oneshot)
//!         head delivered → returned to the connection
//!         head dropped   → DispatchError::Aborted (connection closed)
//! ```
//!
//! # Chain Protocol
//! Handlers run one at a time against the same `Request`/`Response` pair.
//! `Continue` (and a `Reply` marked `next`) moves on, every other outcome
//! ends the exchange. A chain that runs out answers 404 unless it already
//! streamed something. A failing handler aborts the exchange.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::http::{header, Method, StatusCode};
use axum::BoxError;
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::Instrument;

use super::request::Request;
use super::response::{Response, ResponseHead};
use crate::handler::{BoxFuture, BoxedHandler, HandlerError, Outcome};
use crate::observability::metrics;
use crate::routing::{Mounts, RouteMatch, Router};

/// Failure to produce any response for an exchange.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The handler chain failed before a response head was sent.
    #[error("handler chain aborted without a response")]
    Aborted,
}

/// How a chain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    /// A handler produced a terminal outcome.
    Terminated,
    /// Every handler asked to continue.
    Exhausted,
    /// A handler failed; the exchange was aborted.
    Failed,
}

enum Step {
    Next,
    Stop,
}

/// Frozen routing tables plus the per-exchange settings.
#[derive(Debug)]
pub struct Dispatcher {
    router: Router,
    mounts: Mounts,
    body_limit: usize,
}

impl Dispatcher {
    pub fn new(router: Router, mounts: Mounts, body_limit: usize) -> Self {
        Self {
            router,
            mounts,
            body_limit,
        }
    }

    /// Resolve against the server's own router first, then the mounts.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.router
            .find(method, path)
            .or_else(|| self.mounts.find(method, path))
    }

    /// Run one exchange and return the response head.
    pub async fn handle(&self, req: axum::http::Request<Body>) -> Result<ResponseHead, DispatchError> {
        let start = Instant::now();
        let method = req.method().clone();

        let Some(found) = self.resolve(&method, req.uri().path()) else {
            tracing::debug!(method = %method, path = %req.uri().path(), "No route matched");
            metrics::record_route_miss();
            metrics::record_request(method.as_str(), StatusCode::NOT_FOUND.as_u16(), start);
            return Ok(empty_head(StatusCode::NOT_FOUND));
        };

        let if_none_match = req
            .headers()
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let request = Request::from_http(req, found.params, self.body_limit);
        let (head_tx, head_rx) = oneshot::channel();
        let response = Response::new(if_none_match, head_tx);

        tokio::spawn(execute(found.handlers, request, response).instrument(tracing::Span::current()));

        match head_rx.await {
            Ok(head) => {
                metrics::record_request(method.as_str(), head.status().as_u16(), start);
                Ok(head)
            }
            Err(_) => Err(DispatchError::Aborted),
        }
    }
}

/// Run a handler chain to its end.
pub async fn execute(handlers: Vec<BoxedHandler>, req: Request, mut res: Response) -> ChainEnd {
    for handler in handlers {
        let step = match handler.call(req.clone()).await {
            Ok(outcome) => apply(outcome, &mut res).await,
            Err(err) => Err(err),
        };

        match step {
            Ok(Step::Next) => continue,
            Ok(Step::Stop) => return ChainEnd::Terminated,
            Err(err) => {
                tracing::error!(
                    request_id = req.request_id().unwrap_or("unknown"),
                    method = %req.method(),
                    path = req.path(),
                    error = %err,
                    "Handler chain failed"
                );
                metrics::record_handler_error();
                res.abort().await;
                return ChainEnd::Failed;
            }
        }
    }

    tracing::debug!(path = req.path(), flushed = res.is_flushed(), "Handler chain exhausted");
    res.finish_exhausted();
    ChainEnd::Exhausted
}

fn empty_head(status: StatusCode) -> ResponseHead {
    let mut head = ResponseHead::new(Body::empty());
    *head.status_mut() = status;
    head
}

async fn apply(outcome: Outcome, res: &mut Response) -> Result<Step, HandlerError> {
    match outcome {
        Outcome::Text(text) => res.end(Some(Bytes::from(text))).await,
        Outcome::Empty => res.end(None).await,
        Outcome::Continue => return Ok(Step::Next),
        Outcome::File(path) => res.send_file(&path).await,
        Outcome::Reply(reply) => {
            if let Some(status) = &reply.status {
                res.set_status(status.code(), status.message())?;
            }
            if let Some(headers) = reply.headers {
                res.set_headers(headers);
            }
            if reply.next {
                if let Some(body) = reply.body {
                    res.write(body).await;
                }
                return Ok(Step::Next);
            }
            res.end(reply.body).await;
        }
    }
    Ok(Step::Stop)
}

/// Tower service running every request through a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchService {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl<B> tower::Service<axum::http::Request<B>> for DispatchService
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = ResponseHead;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<ResponseHead, DispatchError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: axum::http::Request<B>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        Box::pin(async move { dispatcher.handle(req.map(Body::new)).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerError, IntoHandlers, Reply};
    use crate::routing::Routes;
    use axum::body::to_bytes;

    async fn run(handlers: impl IntoHandlers) -> (ChainEnd, Option<(StatusCode, String)>) {
        let (head_tx, head_rx) = oneshot::channel();
        let response = Response::new(None, head_tx);
        let end = execute(handlers.into_tree().flatten(), Request::empty(), response).await;

        let head = match head_rx.await {
            Ok(head) => head,
            Err(_) => return (end, None),
        };
        let status = head.status();
        let body = to_bytes(head.into_body(), usize::MAX).await.unwrap();
        (end, Some((status, String::from_utf8(body.to_vec()).unwrap())))
    }

    #[tokio::test]
    async fn continue_then_text() {
        let (end, head) = run([Outcome::Continue, Outcome::Text("done".into())]).await;
        assert_eq!(end, ChainEnd::Terminated);
        assert_eq!(head, Some((StatusCode::OK, "done".to_owned())));
    }

    #[tokio::test]
    async fn reply_status_without_body_ends_empty() {
        let (end, head) = run(Reply::new().status(404)).await;
        assert_eq!(end, ChainEnd::Terminated);
        assert_eq!(head, Some((StatusCode::NOT_FOUND, String::new())));
    }

    #[tokio::test]
    async fn reply_with_next_writes_and_continues() {
        let (end, head) = run(crate::handlers![Reply::new().body("a").next(), "b"]).await;
        assert_eq!(end, ChainEnd::Terminated);
        assert_eq!(head, Some((StatusCode::OK, "ab".to_owned())));
    }

    #[tokio::test]
    async fn exhausted_chain_is_not_found() {
        let (end, head) = run([Outcome::Continue, Outcome::Continue]).await;
        assert_eq!(end, ChainEnd::Exhausted);
        assert_eq!(head, Some((StatusCode::NOT_FOUND, String::new())));
    }

    #[tokio::test]
    async fn exhausted_after_streaming_keeps_body() {
        let (end, head) = run(Reply::new().status(202).body("partial").next()).await;
        assert_eq!(end, ChainEnd::Exhausted);
        assert_eq!(head, Some((StatusCode::ACCEPTED, "partial".to_owned())));
    }

    #[tokio::test]
    async fn failing_handler_aborts_without_head() {
        let failing = handler_fn(|_req: Request| async { Err::<(), _>(HandlerError::other("boom")) });
        let (end, head) = run(crate::handlers![Outcome::Continue, failing, "unreachable"]).await;
        assert_eq!(end, ChainEnd::Failed);
        assert_eq!(head, None);
    }

    #[tokio::test]
    async fn invalid_status_fails_the_chain() {
        let (end, head) = run(Reply::new().status(42)).await;
        assert_eq!(end, ChainEnd::Failed);
        assert_eq!(head, None);
    }

    #[tokio::test]
    async fn handle_resolves_own_routes_then_mounts() {
        let mut router = Router::new();
        router.get("/health", "ok");
        let mut api = Router::new();
        api.post("/User/Message", "sent");
        let mut mounts = Mounts::new();
        mounts.insert("/api", api);

        let dispatcher = Dispatcher::new(router, mounts, 1024);
        assert!(dispatcher.resolve(&Method::GET, "/health").is_some());
        assert!(dispatcher.resolve(&Method::POST, "/api/User/Message").is_some());
        assert!(dispatcher.resolve(&Method::GET, "/api/health").is_none());

        let req = axum::http::Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let head = dispatcher.handle(req).await.unwrap();
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
    }
}
