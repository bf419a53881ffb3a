//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ownership (ownership.rs):
//!     Shared::new → share (+1) → release (-1) → value dropped on last release
//!
//! Running phase (event_loop.rs):
//!     EventLoop::run blocks → StopHandle::stop → run returns
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → message on the loop → handler requests stop
//! ```
//!
//! # Design Decisions
//! - One current-thread runtime per loop: all loop state stays on one thread
//! - Stop requests are sticky; a stopped loop never runs again

pub mod event_loop;
pub mod ownership;
pub mod signals;

pub use event_loop::{EventLoop, StopHandle};
pub use ownership::{Released, Shared};
pub use signals::{SignalSender, Signals, TerminationSignal};
