//! TCP listener with backpressure.
//!
//! # Responsibilities
//! - Bind the engine's service address
//! - Accept incoming TCP connections
//! - Enforce a connection limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),

    #[error("listener closed")]
    Closed,
}

/// A bounded TCP listener that limits concurrent connections.
///
/// When the limit is reached, accepting waits until a slot is released.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl Listener {
    /// Bind `addr` synchronously.
    ///
    /// Must be called inside a Tokio runtime context (see `EventLoop::enter`).
    pub fn bind(addr: SocketAddr, max_connections: usize) -> Result<Self, ListenerError> {
        let bind_failed = |source| ListenerError::Bind { addr, source };

        let std_listener = std::net::TcpListener::bind(addr).map_err(bind_failed)?;
        std_listener.set_nonblocking(true).map_err(bind_failed)?;
        let listener = TcpListener::from_std(std_listener).map_err(bind_failed)?;

        let local_addr = listener.local_addr().map_err(bind_failed)?;
        tracing::info!(
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::Closed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot, released on drop.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::EventLoop;

    #[test]
    fn permits_bound_connections() {
        let event_loop = EventLoop::new().unwrap();
        let _guard = event_loop.enter();
        let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), 2).unwrap();
        assert_eq!(listener.max_connections(), 2);
        assert_eq!(listener.available_permits(), 2);
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn bind_conflict_is_reported() {
        let event_loop = EventLoop::new().unwrap();
        let _guard = event_loop.enter();
        let first = Listener::bind("127.0.0.1:0".parse().unwrap(), 1).unwrap();
        let addr = first.local_addr().unwrap();
        let err = Listener::bind(addr, 1).unwrap_err();
        assert!(matches!(err, ListenerError::Bind { .. }));
    }
}
