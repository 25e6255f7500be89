//! Open connection tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Keep the set of open connections for `close()`
//! - Forcibly end every open connection on request
//!
//! # Design Decisions
//! - The set is a `DashMap` so accept and connection tasks never contend on
//!   one lock
//! - Removal is tied to a guard's `Drop`, so a finished or panicked
//!   connection task always leaves the set

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Notify;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Relaxed ordering is enough: only uniqueness is needed.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The set of open connections, each with a kill switch.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    open: Arc<DashMap<ConnectionId, Arc<Notify>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new connection. The guard removes it again when dropped.
    pub fn track(&self) -> ConnectionGuard {
        let id = ConnectionId::new();
        let kill = Arc::new(Notify::new());
        self.open.insert(id, Arc::clone(&kill));
        metrics::record_open_connections(self.open.len());
        tracing::trace!(connection_id = %id, "Connection tracked");

        ConnectionGuard {
            open: Arc::clone(&self.open),
            id,
            kill,
        }
    }

    /// Number of connections currently open.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Signal every open connection to stop immediately.
    ///
    /// Returns how many connections were signalled.
    pub fn destroy_all(&self) -> usize {
        let mut count = 0;
        for entry in self.open.iter() {
            entry.value().notify_one();
            count += 1;
        }
        count
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    open: Arc<DashMap<ConnectionId, Arc<Notify>>>,
    id: ConnectionId,
    kill: Arc<Notify>,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Resolves once the tracker asked this connection to stop.
    pub async fn killed(&self) {
        self.kill.notified().await;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.open.remove(&self.id);
        metrics::record_open_connections(self.open.len());
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn guards_add_and_remove() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.open_count(), 0);

        let guard1 = tracker.track();
        let guard2 = tracker.track();
        assert_eq!(tracker.open_count(), 2);

        drop(guard1);
        assert_eq!(tracker.open_count(), 1);

        drop(guard2);
        assert_eq!(tracker.open_count(), 0);
    }

    #[tokio::test]
    async fn destroy_all_wakes_every_connection() {
        let tracker = ConnectionTracker::new();
        let guard1 = tracker.track();
        let guard2 = tracker.track();

        assert_eq!(tracker.destroy_all(), 2);

        // The signal is kept until the connection task waits for it.
        tokio::time::timeout(Duration::from_secs(1), guard1.killed())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), guard2.killed())
            .await
            .unwrap();
    }
}
