//! Serve files from a directory through a path parameter.
//!
//! ```rust,ignore
//! server.get("/static/:file", StaticDir::new("./public"));
//! ```
//!
//! The parameter value is resolved below the root. Any component that could
//! leave the root (`..`, an absolute path, a drive prefix) rejects the
//! request with 400 before the file system is touched.

use std::path::{Component, Path, PathBuf};

use crate::handler::{BoxFuture, Handler, HandlerResult, Outcome, Reply};
use crate::http::Request;

/// Handler answering with a file below `root`.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
    param: String,
}

impl StaticDir {
    /// Serve `root`, taking the file name from the `file` path parameter.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            param: "file".to_owned(),
        }
    }

    /// Take the file name from a different path parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.param = name.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(url_path.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }
}

impl Handler for StaticDir {
    fn call(&self, req: Request) -> BoxFuture<'static, HandlerResult> {
        let outcome = match req.param(&self.param).and_then(|p| self.map_path(p)) {
            Some(path) => Outcome::File(path),
            None => {
                tracing::warn!(path = req.path(), "Rejected static file path");
                Outcome::Reply(Reply::new().status(400))
            }
        };
        Box::pin(async move { Ok(outcome) })
    }
}
