//! Client connection bookkeeping for the engine.
//!
//! # Responsibilities
//! - Give every accepted client a `conn-N` id for log correlation
//! - Count live and total connections so the engine can report them
//! - Log each connection's peer and lifetime when it ends

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

// Ids only need to be unique, so relaxed ordering is enough.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Counts {
    active: AtomicU64,
    total: AtomicU64,
}

/// Live and cumulative connection counts, shared by clones.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    counts: Arc<Counts>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection from `peer`. Dropping the guard ends it.
    pub fn open(&self, peer: SocketAddr) -> ConnectionGuard {
        self.counts.active.fetch_add(1, Ordering::SeqCst);
        self.counts.total.fetch_add(1, Ordering::Relaxed);

        let guard = ConnectionGuard {
            counts: Arc::clone(&self.counts),
            id: ConnectionId::next(),
            peer,
            opened_at: Instant::now(),
        };
        tracing::debug!(connection_id = %guard.id, peer_addr = %peer, "Connection opened");
        guard
    }

    /// Connections currently open.
    pub fn active_count(&self) -> u64 {
        self.counts.active.load(Ordering::SeqCst)
    }

    /// Connections opened since the tracker was created.
    pub fn total_count(&self) -> u64 {
        self.counts.total.load(Ordering::Relaxed)
    }
}

/// One open client connection.
#[derive(Debug)]
pub struct ConnectionGuard {
    counts: Arc<Counts>,
    id: ConnectionId,
    peer: SocketAddr,
    opened_at: Instant,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counts.active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(
            connection_id = %self.id,
            peer_addr = %self.peer,
            duration_ms = self.opened_at.elapsed().as_millis() as u64,
            "Connection closed"
        );
    }
}
