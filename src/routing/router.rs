//! Route registration surface and middleware-aware lookup.
//!
//! # Responsibilities
//! - Per-method registration helpers over a [`RouteStore`]
//! - A middleware chain run before every route of this router
//!
//! # Design Decisions
//! - Middleware is scoped to the router it was registered on
//! - Registration happens before serving; lookups never mutate
//! - Mount paths live in the server, not in the router

use axum::http::Method;

use super::store::{RouteMatch, RouteStore};
use crate::handler::{BoxedHandler, IntoHandlers};

/// Registration methods shared by [`Router`] and the server.
pub trait Routes {
    /// Register `handlers` for an arbitrary method.
    fn on(&mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> &mut Self;

    /// Append handlers run before every route of this router.
    fn middleware(&mut self, handlers: impl IntoHandlers) -> &mut Self;

    fn connect(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::CONNECT, path, handlers)
    }

    fn delete(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::DELETE, path, handlers)
    }

    fn get(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::GET, path, handlers)
    }

    fn head(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::HEAD, path, handlers)
    }

    fn options(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::OPTIONS, path, handlers)
    }

    fn patch(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::PATCH, path, handlers)
    }

    fn post(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::POST, path, handlers)
    }

    fn put(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::PUT, path, handlers)
    }

    fn trace(&mut self, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.on(Method::TRACE, path, handlers)
    }
}

/// A route table plus the middleware that precedes each of its routes.
#[derive(Default)]
pub struct Router {
    store: RouteStore,
    middleware: Vec<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a route; the match's chain starts with this router's middleware.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let found = self.store.find(method, path)?;
        if self.middleware.is_empty() {
            return Some(found);
        }

        let mut handlers = Vec::with_capacity(self.middleware.len() + found.handlers.len());
        handlers.extend(self.middleware.iter().cloned());
        handlers.extend(found.handlers);
        Some(RouteMatch {
            handlers,
            params: found.params,
        })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("store", &self.store)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl Routes for Router {
    fn on(&mut self, method: Method, path: &str, handlers: impl IntoHandlers) -> &mut Self {
        self.store.add(method, path, handlers);
        self
    }

    fn middleware(&mut self, handlers: impl IntoHandlers) -> &mut Self {
        self.middleware.extend(handlers.into_tree().flatten());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Outcome;
    use crate::handlers;
    use crate::http::Request;

    async fn texts(found: RouteMatch) -> Vec<String> {
        let mut out = Vec::new();
        for handler in found.handlers {
            match handler.call(Request::empty()).await.unwrap() {
                Outcome::Text(text) => out.push(text),
                Outcome::Continue => out.push("next".to_owned()),
                _ => {}
            }
        }
        out
    }

    #[tokio::test]
    async fn middleware_is_flattened_and_prepended() {
        let mut router = Router::new();
        router
            .middleware(handlers!["a", handlers!["b", handlers![handlers!["c"]]]])
            .get("/", "route");

        let found = router.find(&Method::GET, "/").unwrap();
        assert_eq!(texts(found).await, vec!["a", "b", "c", "route"]);
    }

    #[tokio::test]
    async fn middleware_appends_in_registration_order() {
        let mut router = Router::new();
        router.middleware("one").post("/Message", "msg").middleware("two");

        let found = router.find(&Method::POST, "/Message").unwrap();
        assert_eq!(texts(found).await, vec!["one", "two", "msg"]);
    }

    #[test]
    fn verb_helpers_register_their_method() {
        let mut router = Router::new();
        router
            .connect("/r", "x")
            .delete("/r", "x")
            .get("/r", "x")
            .head("/r", "x")
            .options("/r", "x")
            .patch("/r", "x")
            .post("/r", "x")
            .put("/r", "x")
            .trace("/r", "x");

        for method in [
            Method::CONNECT,
            Method::DELETE,
            Method::GET,
            Method::HEAD,
            Method::OPTIONS,
            Method::PATCH,
            Method::POST,
            Method::PUT,
            Method::TRACE,
        ] {
            assert!(router.find(&method, "/r").is_some(), "{method} not registered");
        }
    }

    #[test]
    fn miss_ignores_middleware() {
        let mut router = Router::new();
        router.middleware(Outcome::Continue);
        assert!(router.find(&Method::GET, "/nothing").is_none());
    }
}
