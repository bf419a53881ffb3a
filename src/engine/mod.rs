//! Streaming engine seam.
//!
//! # Data Flow
//! ```text
//! Server::create
//!     → Engine (bound to the configured port, not yet serving)
//! Mount pass
//!     → Engine::mount_points() → MountRegistry::add_factory per device
//! Server::deploy
//!     → Engine::attach(&EventLoop) (bind + spawn serving tasks on the loop)
//!     → EventLoop::run
//! ```
//!
//! # Design Decisions
//! - The engine owns the wire protocol; the core only registers endpoints,
//!   attaches, and runs/stops the loop
//! - `RtspEngine` is the built-in engine; other engines plug in through the
//!   `Engine` trait

pub mod mount_points;
pub mod rtsp;

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::lifecycle::EventLoop;
use crate::net::ListenerError;

pub use mount_points::{
    is_valid_endpoint_path, MediaFactory, MountError, MountPoints, MountRegistry, TransportMode,
};
pub use rtsp::RtspEngine;

/// Engine construction and attach failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid service port {0:?}")]
    InvalidPort(String),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to create event loop: {0}")]
    EventLoop(#[source] std::io::Error),

    #[error("engine is already attached to {0}")]
    AlreadyAttached(SocketAddr),

    #[error("failed to attach engine: {0}")]
    Attach(String),
}

/// The streaming engine a server drives.
pub trait Engine: Send {
    /// The registry endpoints are mounted into.
    fn mount_points(&self) -> Arc<dyn MountRegistry>;

    /// Start serving on `event_loop`. Work only progresses while the loop runs.
    fn attach(&mut self, event_loop: &EventLoop) -> Result<(), EngineError>;
}
