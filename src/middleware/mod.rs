//! Reusable request-validation handlers.
//!
//! Each guard either lets the chain continue or answers `400 Bad Request`
//! with an explanatory body. Register them as router middleware or in front
//! of a single route:
//!
//! ```rust,ignore
//! let mut api = Router::new();
//! api.middleware(handlers![
//!     require_header("X-Requested-With", r#"Header "X-Requested-With" must be sent."#),
//!     handlers![require_content_type("application/json"), json_body::<User>()],
//! ]);
//! ```

mod guards;
mod json;

pub use guards::{require_content_type, require_header};
pub use json::json_body;
