//! Errors raised while running a handler chain.

/// Failure of a single handler. Any error ends the exchange without a response.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The transport failed while delivering the request body, or the body
    /// exceeded the configured size limit.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The body stream was handed out before the cached accessors ran.
    #[error("request body has already been taken")]
    BodyTaken,

    /// The request body is not valid JSON (or not the expected shape).
    #[error("request body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A handler produced a status code outside 100..=999.
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    /// Handler-defined failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wrap any error (or message) as a handler failure.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Other(err.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        HandlerError::Other(Box::new(err))
    }
}
