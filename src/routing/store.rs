//! Segment trie holding handler chains per (method, pattern).
//!
//! # Design Decisions
//! - One node per path segment; `:name` segments share a single dynamic
//!   child per node whose parameter name is fixed when it is created
//! - Lookup prefers the exact static child and falls back to the dynamic
//!   child, without backtracking
//! - Registering the same method and pattern again replaces the chain

use std::collections::HashMap;
use std::fmt;

use axum::http::Method;

use crate::handler::{BoxedHandler, IntoHandlers};

#[derive(Default)]
struct RouteNode {
    children: HashMap<String, RouteNode>,
    dynamic: Option<Box<RouteNode>>,
    methods: HashMap<Method, Vec<BoxedHandler>>,
    param_name: Option<String>,
}

impl RouteNode {
    fn dynamic(name: &str) -> Self {
        Self {
            param_name: Some(name.to_owned()),
            ..Self::default()
        }
    }
}

/// A resolved route: the chain to run and the captured parameters.
#[derive(Clone, Default)]
pub struct RouteMatch {
    pub handlers: Vec<BoxedHandler>,
    pub params: HashMap<String, String>,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("handlers", &self.handlers.len())
            .field("params", &self.params)
            .finish()
    }
}

/// Route table for one router.
#[derive(Default)]
pub struct RouteStore {
    root: RouteNode,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handlers` for `method` and `pattern`.
    pub fn add(&mut self, method: Method, pattern: &str, handlers: impl IntoHandlers) {
        let mut node = &mut self.root;

        for segment in segments(pattern) {
            node = match segment.strip_prefix(':') {
                Some(name) => &mut **node
                    .dynamic
                    .get_or_insert_with(|| Box::new(RouteNode::dynamic(name))),
                None => node.children.entry(segment.to_owned()).or_default(),
            };
        }

        let chain = handlers.into_tree().flatten();
        tracing::debug!(method = %method, pattern, handlers = chain.len(), "Route registered");
        node.methods.insert(method, chain);
    }

    /// Resolve `method` and `path` to a chain and its parameters.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let mut node = &self.root;
        let mut params = HashMap::new();

        for segment in segments(path) {
            node = match node.children.get(segment) {
                Some(child) => child,
                None => node.dynamic.as_deref()?,
            };
            if let Some(name) = &node.param_name {
                params.insert(name.clone(), segment.to_owned());
            }
        }

        let handlers = node.methods.get(method)?.clone();
        Some(RouteMatch { handlers, params })
    }
}

impl fmt::Debug for RouteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteStore").finish_non_exhaustive()
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
