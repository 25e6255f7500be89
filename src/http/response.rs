//! Outbound response writer driven by the dispatcher.
//!
//! # Responsibilities
//! - Accumulate status and ordered headers until the first flush
//! - Attach a strong ETag and answer 304 when it matches `If-None-Match`
//! - Stream bodies written in several chunks
//! - Send files from disk in chunks with a modification-time validator
//!
//! # Transport States
//! ```text
//! Pending ──end──────────────► Closed
//!    │                           ▲
//!    └──write──► Streaming ──end─┘
//! ```
//! Leaving `Pending` is the single header flush: the response head is handed
//! to the connection through a oneshot channel. A streaming body is fed
//! through an mpsc channel after that.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use axum::body::Body;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use hyper::ext::ReasonPhrase;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};

use super::etag::{strong_etag, ValidatorKind};
use super::headers::{FieldValue, Headers};
use crate::handler::HandlerError;

/// Size of the read buffer used by [`Response::send_file`].
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the chain and a slow client.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// Head of a transport response.
pub type ResponseHead = axum::http::Response<Body>;

type BodyChunk = Result<Bytes, io::Error>;

enum Transport {
    Pending(oneshot::Sender<ResponseHead>),
    Streaming(mpsc::Sender<BodyChunk>),
    Closed,
}

/// Mutable response for one exchange.
pub struct Response {
    status: StatusCode,
    message: String,
    headers: Headers,
    if_none_match: Option<String>,
    transport: Transport,
}

impl Response {
    /// Create a response that hands its head to `head_tx` on first flush.
    pub fn new(if_none_match: Option<String>, head_tx: oneshot::Sender<ResponseHead>) -> Self {
        Self {
            status: StatusCode::OK,
            message: "OK".to_owned(),
            headers: Headers::new(),
            if_none_match,
            transport: Transport::Pending(head_tx),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether the response head has been handed to the transport.
    pub fn is_flushed(&self) -> bool {
        !matches!(self.transport, Transport::Pending(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.transport, Transport::Closed)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        if self.is_flushed() {
            tracing::warn!("Header set after the response was flushed; ignoring");
            return self;
        }
        self.headers.set(name, value);
        self
    }

    pub fn set_headers(&mut self, headers: Headers) -> &mut Self {
        if self.is_flushed() {
            tracing::warn!("Headers set after the response was flushed; ignoring");
            return self;
        }
        self.headers.merge(headers);
        self
    }

    /// Set the status code and reason phrase.
    ///
    /// Without a message the canonical reason phrase is used.
    pub fn set_status(&mut self, code: u16, message: Option<&str>) -> Result<&mut Self, HandlerError> {
        let status = StatusCode::from_u16(code).map_err(|_| HandlerError::InvalidStatus(code))?;
        if self.is_flushed() {
            tracing::warn!(status = code, "Status set after the response was flushed; ignoring");
            return Ok(self);
        }
        self.status = status;
        self.message = match message {
            Some(message) => message.to_owned(),
            None => status.canonical_reason().unwrap_or_default().to_owned(),
        };
        Ok(self)
    }

    /// Finish the response, optionally with a last chunk.
    ///
    /// Before the flush this computes the content ETag: a match with
    /// `If-None-Match` answers 304 without a body.
    pub async fn end(&mut self, chunk: Option<Bytes>) {
        match std::mem::replace(&mut self.transport, Transport::Closed) {
            Transport::Pending(head_tx) => {
                let tag = self.etag(ValidatorKind::Content, chunk.as_deref());
                if self.if_none_match.as_deref() == Some(tag.as_str()) {
                    self.send_not_modified(head_tx, tag);
                    return;
                }
                self.headers.set("ETag", tag);
                let head = self.head(Some(&self.headers), Body::from(chunk.unwrap_or_default()));
                deliver(head_tx, head);
            }
            Transport::Streaming(body_tx) => {
                if let Some(chunk) = chunk.filter(|c| !c.is_empty()) {
                    if body_tx.send(Ok(chunk)).await.is_err() {
                        tracing::debug!("Client went away before the last chunk");
                    }
                }
            }
            Transport::Closed => {
                tracing::warn!("end called on a closed response; ignoring");
            }
        }
    }

    /// Write a chunk without closing, flushing the head first if needed.
    pub async fn write(&mut self, chunk: Bytes) {
        if let Transport::Pending(_) = self.transport {
            self.start_streaming();
        }

        let Transport::Streaming(body_tx) = &self.transport else {
            tracing::warn!("write called on a closed response; ignoring");
            return;
        };

        if chunk.is_empty() {
            return;
        }
        if body_tx.send(Ok(chunk)).await.is_err() {
            tracing::debug!("Client went away while streaming");
            self.transport = Transport::Closed;
        }
    }

    /// Stream a file from disk.
    ///
    /// A missing file answers 400, any other I/O failure 500, both without a
    /// body. The ETag is derived from the modification time.
    pub async fn send_file(&mut self, path: &Path) {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(err) => return self.file_error(path, err),
        };
        let metadata = match file.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => return self.file_error(path, err),
        };

        if !self.is_flushed() && !self.headers.contains_ignore_case("Content-Type") {
            self.headers.set("Content-Type", content_type_for(path));
        }

        let modified_ms = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|since| since.as_nanos() as f64 / 1_000_000.0)
            .unwrap_or_default();
        let tag = self.etag(ValidatorKind::Modified, Some(modified_ms.to_string().as_bytes()));

        if self.if_none_match.as_deref() == Some(tag.as_str()) {
            if let Transport::Pending(head_tx) = std::mem::replace(&mut self.transport, Transport::Closed) {
                self.send_not_modified(head_tx, tag);
            }
            return;
        }
        if !self.is_flushed() {
            self.headers.set("ETag", tag);
        }

        let mut buf = BytesMut::with_capacity(FILE_CHUNK_SIZE);
        loop {
            match file.read_buf(&mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let chunk = buf.split().freeze();
                    buf.reserve(FILE_CHUNK_SIZE);
                    self.write(chunk).await;
                    if self.is_closed() {
                        return;
                    }
                }
                Err(err) if !self.is_flushed() => return self.file_error(path, err),
                Err(err) => {
                    tracing::error!(path = %path.display(), error = %err, "File read failed mid-stream");
                    self.abort_with(err).await;
                    return;
                }
            }
        }

        if !self.is_flushed() {
            self.start_streaming();
        }
        self.transport = Transport::Closed;
    }

    /// Answer a failed file open with a bare status and no body.
    fn file_error(&mut self, path: &Path, err: io::Error) {
        let code = if err.kind() == io::ErrorKind::NotFound { 400 } else { 500 };
        tracing::warn!(path = %path.display(), error = %err, status = code, "File response failed");

        let Transport::Pending(head_tx) = std::mem::replace(&mut self.transport, Transport::Closed) else {
            return;
        };
        self.status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.message = self.status.canonical_reason().unwrap_or_default().to_owned();
        deliver(head_tx, self.head(None, Body::empty()));
    }

    /// Handle a chain that ran out of handlers.
    ///
    /// Nothing flushed yet answers 404 with an empty body; an open stream is
    /// closed as is.
    pub fn finish_exhausted(&mut self) {
        match std::mem::replace(&mut self.transport, Transport::Closed) {
            Transport::Pending(head_tx) => {
                self.status = StatusCode::NOT_FOUND;
                self.message = "Not Found".to_owned();
                deliver(head_tx, self.head(None, Body::empty()));
            }
            Transport::Streaming(_) | Transport::Closed => {}
        }
    }

    /// Abandon the exchange without producing a response.
    ///
    /// Before the flush the head is never delivered; afterwards the body
    /// stream fails so the connection is dropped mid-body.
    pub async fn abort(&mut self) {
        self.abort_with(io::Error::other("handler chain failed")).await;
    }

    async fn abort_with(&mut self, err: io::Error) {
        if let Transport::Streaming(body_tx) = std::mem::replace(&mut self.transport, Transport::Closed) {
            let _ = body_tx.send(Err(err)).await;
        }
    }

    fn start_streaming(&mut self) {
        let Transport::Pending(head_tx) = std::mem::replace(&mut self.transport, Transport::Closed) else {
            return;
        };
        let (body_tx, body_rx) = mpsc::channel::<BodyChunk>(BODY_CHANNEL_CAPACITY);
        let stream = futures_util::stream::unfold(body_rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        let head = self.head(Some(&self.headers), Body::from_stream(stream));
        if head_tx.send(head).is_err() {
            tracing::debug!("Client went away before the response head");
            return;
        }
        self.transport = Transport::Streaming(body_tx);
    }

    fn send_not_modified(&mut self, head_tx: oneshot::Sender<ResponseHead>, tag: String) {
        self.status = StatusCode::NOT_MODIFIED;
        self.message = "Not Modified".to_owned();
        let head = self.head(Some(&Headers::new().with("ETag", tag)), Body::empty());
        deliver(head_tx, head);
    }

    fn etag(&self, kind: ValidatorKind, content: Option<&[u8]>) -> String {
        strong_etag(self.status.as_u16(), &self.message, &self.headers, kind, content)
    }

    fn head(&self, headers: Option<&Headers>, body: Body) -> ResponseHead {
        let mut head = ResponseHead::new(body);
        *head.status_mut() = self.status;
        if let Some(headers) = headers {
            headers.write_to(head.headers_mut());
        }
        if self.status.canonical_reason() != Some(self.message.as_str()) {
            match ReasonPhrase::try_from(self.message.as_bytes()) {
                Ok(reason) => {
                    head.extensions_mut().insert(reason);
                }
                Err(_) => tracing::warn!(message = %self.message, "Invalid reason phrase; using the default"),
            }
        }
        head
    }
}

fn deliver(head_tx: oneshot::Sender<ResponseHead>, head: ResponseHead) {
    if head_tx.send(head).is_err() {
        tracing::debug!("Client went away before the response head");
    }
}

/// Guess a content type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn response(if_none_match: Option<&str>) -> (Response, oneshot::Receiver<ResponseHead>) {
        let (tx, rx) = oneshot::channel();
        (Response::new(if_none_match.map(str::to_owned), tx), rx)
    }

    async fn body_text(head: ResponseHead) -> String {
        let bytes = to_bytes(head.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn end_sets_etag_and_body() {
        let (mut res, rx) = response(None);
        res.end(Some(Bytes::from_static(b"x"))).await;

        let head = rx.await.unwrap();
        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.headers()["etag"], "\"4SVAg33RqjT5L9PkpulvhcU1HY0=\"");
        assert_eq!(body_text(head).await, "x");
        assert!(res.is_closed());
    }

    #[tokio::test]
    async fn matching_etag_answers_not_modified() {
        let (mut res, rx) = response(Some("\"4SVAg33RqjT5L9PkpulvhcU1HY0=\""));
        res.end(Some(Bytes::from_static(b"x"))).await;

        let head = rx.await.unwrap();
        assert_eq!(head.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(body_text(head).await, "");
    }

    #[tokio::test]
    async fn writes_stream_into_one_body() {
        let (mut res, rx) = response(None);
        res.set_header("Content-Type", "text/plain");
        res.write(Bytes::from_static(b"a")).await;
        assert!(res.is_flushed());

        res.set_header("X-Late", "ignored");
        let head = rx.await.unwrap();
        assert_eq!(head.headers()["content-type"], "text/plain");
        assert!(head.headers().get("etag").is_none());

        res.end(Some(Bytes::from_static(b"b"))).await;
        drop(res);
        assert_eq!(body_text(head).await, "ab");
    }

    #[tokio::test]
    async fn custom_status_message_is_kept() {
        let (mut res, rx) = response(None);
        res.set_status(418, Some("Short And Stout")).unwrap();
        assert_eq!(res.message(), "Short And Stout");
        res.end(None).await;

        let head = rx.await.unwrap();
        assert_eq!(head.status().as_u16(), 418);
        let reason = head.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"Short And Stout");
    }

    #[test]
    fn default_status_message_is_canonical() {
        let (mut res, _rx) = response(None);
        res.set_status(404, None).unwrap();
        assert_eq!(res.message(), "Not Found");
        assert!(matches!(res.set_status(42, None), Err(HandlerError::InvalidStatus(42))));
    }

    #[tokio::test]
    async fn missing_file_is_a_bad_request() {
        let (mut res, rx) = response(None);
        res.set_header("X-Kept", "no");
        res.send_file(Path::new("/definitely/not/here.txt")).await;

        let head = rx.await.unwrap();
        assert_eq!(head.status(), StatusCode::BAD_REQUEST);
        assert!(head.headers().get("x-kept").is_none());
        assert_eq!(body_text(head).await, "");
    }

    #[tokio::test]
    async fn exhausted_chain_answers_not_found() {
        let (mut res, rx) = response(None);
        res.finish_exhausted();
        let head = rx.await.unwrap();
        assert_eq!(head.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn abort_before_flush_drops_the_head() {
        let (mut res, rx) = response(None);
        res.abort().await;
        drop(res);
        assert!(rx.await.is_err());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for(Path::new("a/index.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("app.wasm")), "application/wasm");
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
    }
}
