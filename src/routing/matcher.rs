//! Mount prefixes and the ordered mount table.
//!
//! # Responsibilities
//! - Match a request path against a mount prefix (plain string prefix)
//! - Strip the prefix before the mounted router is consulted
//! - Keep mounts in registration order; the first router to match wins
//!
//! # Design Decisions
//! - Prefix matching is case-sensitive and not segment-aware
//! - Re-mounting a prefix replaces its router but keeps its position

use axum::http::Method;

use super::router::Router;
use super::store::RouteMatch;

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The remainder of `path` after the prefix, if it matches.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.prefix.as_str())
    }
}

/// Routers mounted under path prefixes, in registration order.
#[derive(Debug, Default)]
pub struct Mounts {
    entries: Vec<(PathPrefixMatcher, Router)>,
}

impl Mounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `router` under `prefix`, replacing an earlier mount of the same prefix.
    pub fn insert(&mut self, prefix: impl Into<String>, router: Router) {
        let matcher = PathPrefixMatcher::new(prefix);
        match self.entries.iter_mut().find(|(m, _)| *m == matcher) {
            Some((_, existing)) => *existing = router,
            None => self.entries.push((matcher, router)),
        }
    }

    /// First mounted router that matches the stripped path.
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.entries.iter().find_map(|(matcher, router)| {
            let rest = matcher.strip(path)?;
            router.find(method, rest)
        })
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(m, _)| m.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Routes;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");
        assert_eq!(matcher.strip("/apiary"), Some("ary"));
        assert_eq!(matcher.strip("/api/User"), Some("/User"));
        assert_eq!(matcher.strip("/api"), Some(""));
        assert_eq!(matcher.strip("/other"), None);
    }

    #[test]
    fn mounted_router_sees_stripped_path() {
        let mut router = Router::new();
        router.post("/User/Message", "sent");

        let mut mounts = Mounts::new();
        mounts.insert("/api", router);

        assert!(mounts.find(&Method::POST, "/api/User/Message").is_some());
        assert!(mounts.find(&Method::POST, "/User/Message").is_none());
    }

    #[test]
    fn later_prefix_is_tried_when_earlier_misses() {
        let mut first = Router::new();
        first.get("/a", "first");
        let mut second = Router::new();
        second.get("/b", "second");

        let mut mounts = Mounts::new();
        mounts.insert("/x", first);
        mounts.insert("/x", Router::new());
        mounts.insert("/", second);

        let prefixes: Vec<_> = mounts.prefixes().collect();
        assert_eq!(prefixes, vec!["/x", "/"]);

        // "/x" now holds an empty router.
        assert!(mounts.find(&Method::GET, "/x/a").is_none());
        assert!(mounts.find(&Method::GET, "/b").is_some());
    }
}
