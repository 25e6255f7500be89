//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, hyper connection, request-id/trace layers)
//!     → dispatch.rs (route resolution, handler chain)
//!     → request.rs (what handlers read: headers, params, cached body)
//!     → response.rs (status, headers, ETag/304, streamed body, files)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod etag;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{ChainEnd, DispatchError, DispatchService, Dispatcher};
pub use headers::{FieldValue, Headers};
pub use request::{Request, X_REQUEST_ID};
pub use response::Response;
pub use server::{RunningServer, Server, ServerError};
