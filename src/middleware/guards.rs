//! Header guards.

use crate::handler::{handler_fn, Handler, Outcome, Reply};
use crate::http::Request;

fn bad_request(message: &str) -> Outcome {
    Outcome::Reply(Reply::new().status(400).body(message.to_owned()))
}

/// Continue only when the request carries header `name`.
pub fn require_header(name: impl Into<String>, message: impl Into<String>) -> impl Handler {
    let name = name.into();
    let message = message.into();
    handler_fn(move |req: Request| {
        let outcome = if req.has(&name) {
            Outcome::Continue
        } else {
            tracing::debug!(header = %name, "Required header missing");
            bad_request(&message)
        };
        async move { outcome }
    })
}

/// Continue only when `Content-Type` is exactly `mime`.
pub fn require_content_type(mime: impl Into<String>) -> impl Handler {
    let mime = mime.into();
    let message = format!(r#"Header "Content-Type" must be "{mime}"."#);
    handler_fn(move |req: Request| {
        let outcome = if req.get("Content-Type") == Some(mime.as_str()) {
            Outcome::Continue
        } else {
            bad_request(&message)
        };
        async move { outcome }
    })
}
