//! JSON body validation.

use serde::de::DeserializeOwned;

use crate::handler::{handler_fn, Handler, HandlerError, Outcome, Reply};
use crate::http::Request;

/// Continue only when the body deserializes into `T`.
///
/// A body that is not JSON, or not shaped like `T`, answers 400 with the
/// parser's message. The parsed body stays cached for later handlers.
pub fn json_body<T>() -> impl Handler
where
    T: DeserializeOwned + Send + 'static,
{
    handler_fn(|req: Request| async move {
        match req.json_as::<T>().await {
            Ok(_) => Ok(Outcome::Continue),
            Err(HandlerError::Json(err)) => {
                tracing::debug!(error = %err, "Rejected JSON body");
                Ok(Outcome::Reply(Reply::new().status(400).body(err.to_string())))
            }
            Err(err) => Err(err),
        }
    })
}
