//! Handler return values.
//!
//! A handler's result tells the dispatcher what to do with the exchange:
//!
//! | Outcome    | Dispatcher action                                       |
//! |------------|---------------------------------------------------------|
//! | `Text`     | end the response with the text, stop                    |
//! | `Empty`    | end the response without a body, stop                   |
//! | `Continue` | run the next handler                                    |
//! | `File`     | stream the file, stop                                   |
//! | `Reply`    | apply status/headers, then end (or write and continue)  |

use std::path::PathBuf;

use bytes::Bytes;
use serde::Serialize;

use crate::handler::{HandlerError, HandlerResult};
use crate::http::headers::{FieldValue, Headers};

/// What a handler wants done with the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// End the response with this body.
    Text(String),
    /// End the response with no body.
    Empty,
    /// Hand over to the next handler in the chain.
    Continue,
    /// Send the file at this path; any other response settings are ignored.
    File(PathBuf),
    /// Structured response, optionally continuing the chain.
    Reply(Reply),
}

impl Outcome {
    /// Shorthand for [`Outcome::File`].
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Outcome::File(path.into())
    }
}

/// Response status with an optional custom reason phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Status code; the canonical reason phrase is used.
    Code(u16),
    /// Status code with an explicit reason phrase.
    WithMessage { code: u16, message: String },
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Code(code) => *code,
            Status::WithMessage { code, .. } => *code,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Status::Code(_) => None,
            Status::WithMessage { message, .. } => Some(message),
        }
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Status::Code(code)
    }
}

/// Structured handler response.
///
/// Without `next`, the reply is terminal: status and headers are applied and
/// the response is ended with `body` (or no body). With `next`, the body (if
/// any) is written to the open response and the chain moves on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub status: Option<Status>,
    pub headers: Option<Headers>,
    pub body: Option<Bytes>,
    pub next: bool,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status = Some(Status::Code(code));
        self
    }

    pub fn status_with_message(mut self, code: u16, message: impl Into<String>) -> Self {
        self.status = Some(Status::WithMessage {
            code,
            message: message.into(),
        });
        self
    }

    /// Add a single header, keeping any headers already on the reply.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .set(name, value);
        self
    }

    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = Some(headers.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the body and mark it `application/json`.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }

    /// Continue with the next handler after this reply is applied.
    pub fn next(mut self) -> Self {
        self.next = true;
        self
    }
}

/// Conversion of handler return values into an [`Outcome`].
pub trait IntoOutcome {
    fn into_outcome(self) -> HandlerResult;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoOutcome for Reply {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Reply(self))
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Text(self.to_owned()))
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Text(self))
    }
}

/// `true` continues the chain, `false` ends the response without a body.
impl IntoOutcome for bool {
    fn into_outcome(self) -> HandlerResult {
        Ok(if self { Outcome::Continue } else { Outcome::Empty })
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> HandlerResult {
        Ok(Outcome::Empty)
    }
}

impl<T: IntoOutcome> IntoOutcome for Option<T> {
    fn into_outcome(self) -> HandlerResult {
        match self {
            Some(value) => value.into_outcome(),
            None => Ok(Outcome::Empty),
        }
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<HandlerError>,
{
    fn into_outcome(self) -> HandlerResult {
        self.map_err(Into::into)?.into_outcome()
    }
}
