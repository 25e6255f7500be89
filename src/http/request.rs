//! Inbound request view handed to every handler of a chain.
//!
//! # Responsibilities
//! - Expose method, path, query, headers and extracted path parameters
//! - Read the body from the transport at most once, on first access
//! - Cache the raw bytes, the text and the parsed JSON for the exchange
//!
//! # Design Decisions
//! - `Request` is a cheap `Arc` clone so each handler owns its copy
//! - Each body stage is derived from the previous cached stage
//!   (bytes → text → JSON), never from the transport again
//! - Body reads are bounded by the configured limit

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::handler::HandlerError;

/// Header carrying the id assigned by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One inbound exchange as seen by handlers.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Mutex<Option<Body>>,
    body_limit: usize,
    buffer: OnceCell<Bytes>,
    text: OnceCell<String>,
    json: OnceCell<Value>,
}

impl Request {
    /// Wrap transport request parts and body with the matched path parameters.
    pub fn new(parts: Parts, body: Body, params: HashMap<String, String>, body_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                params,
                body: Mutex::new(Some(body)),
                body_limit,
                buffer: OnceCell::new(),
                text: OnceCell::new(),
                json: OnceCell::new(),
            }),
        }
    }

    /// Convenience over [`Request::new`] for a whole transport request.
    pub fn from_http(
        req: axum::http::Request<Body>,
        params: HashMap<String, String>,
        body_limit: usize,
    ) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body, params, body_limit)
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self::from_http(axum::http::Request::new(Body::empty()), HashMap::new(), 0)
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Raw request path, without the query string.
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.inner.uri.query()
    }

    /// First value of a form-urlencoded query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Path parameters extracted by the route match.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.inner.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.inner.params.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// First value of a header, looked up case-insensitively.
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(name.to_ascii_lowercase())
            .and_then(|v| v.to_str().ok())
    }

    /// Whether a header is present, looked up case-insensitively.
    pub fn has(&self, name: &str) -> bool {
        self.inner.headers.contains_key(name.to_ascii_lowercase())
    }

    /// Id assigned to this exchange, if the request-id layer ran.
    pub fn request_id(&self) -> Option<&str> {
        self.get(X_REQUEST_ID)
    }

    /// The complete body, read from the transport on first call.
    pub async fn buffer(&self) -> Result<&Bytes, HandlerError> {
        self.inner
            .buffer
            .get_or_try_init(|| async {
                let body = self
                    .inner
                    .body
                    .lock()
                    .map_err(|_| HandlerError::BodyTaken)?
                    .take()
                    .ok_or(HandlerError::BodyTaken)?;
                axum::body::to_bytes(body, self.inner.body_limit)
                    .await
                    .map_err(HandlerError::Body)
            })
            .await
    }

    /// The body as text; invalid UTF-8 sequences are replaced.
    pub async fn text(&self) -> Result<&str, HandlerError> {
        let text = self
            .inner
            .text
            .get_or_try_init(|| async {
                let bytes = self.buffer().await?;
                Ok::<_, HandlerError>(String::from_utf8_lossy(bytes).into_owned())
            })
            .await?;
        Ok(text.as_str())
    }

    /// The body parsed as JSON.
    pub async fn json(&self) -> Result<&Value, HandlerError> {
        self.inner
            .json
            .get_or_try_init(|| async {
                let text = self.text().await?;
                Ok::<_, HandlerError>(serde_json::from_str(text)?)
            })
            .await
    }

    /// The cached JSON body deserialized into `T`.
    pub async fn json_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let value = self.json().await?;
        Ok(T::deserialize(value)?)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("params", &self.inner.params)
            .finish_non_exhaustive()
    }
}
