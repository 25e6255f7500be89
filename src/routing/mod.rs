//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     Routes::get/post/.. (path, handlers)
//!     → router.rs (Router, per-router middleware)
//!     → store.rs (segment trie, chain per method)
//!
//! Lookup (per request):
//!     (method, path)
//!     → server's own Router
//!     → matcher.rs (mounts in order, prefix stripped)
//!     → RouteMatch { handlers, params } or no match
//! ```
//!
//! # Design Decisions
//! - Tables are frozen once the server starts; lookups take `&self`
//! - Static segments beat `:param` segments at every level
//! - No regex, no priority ordering beyond that

pub mod matcher;
pub mod router;
pub mod store;

pub use matcher::{Mounts, PathPrefixMatcher};
pub use router::{Router, Routes};
pub use store::{RouteMatch, RouteStore};
