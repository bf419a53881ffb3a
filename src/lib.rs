//! Streaming gateway that exposes named audio devices as RTSP endpoints.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ config ──▶ Logger (observability)
//!                     │            │
//!                     ▼            ▼
//!                  Server (supervisor, state machine)
//!                     │
//!        ┌────────────┼──────────────────┐
//!        ▼            ▼                  ▼
//!   mount pass    Engine::attach     signals ──▶ EventLoop stop
//!   (server::mount)  (engine, net)    (lifecycle)
//! ```
//!
//! Config, logger and server are held through [`lifecycle::Shared`] handles;
//! each is destroyed exactly once, when its last reference is released.

// Core subsystems
pub mod config;
pub mod engine;
pub mod net;
pub mod server;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{EventLoop, Shared, Signals};
pub use observability::Logger;
pub use server::{Server, ServerError, ServerState};
