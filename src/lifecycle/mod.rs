//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls RunningServer::close
//!
//! Shutdown (shutdown.rs):
//!     close → Shutdown::trigger → accept loop stops
//!     → every tracked connection is destroyed
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting first, then drop connections
//! - Close does not wait for in-flight handler chains

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
