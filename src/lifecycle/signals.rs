//! Termination signal delivery.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM (Ctrl-C off unix)
//! - Marshal every delivery onto the event loop as a message
//! - Let tests and embedders inject signals without touching the process
//!
//! # Design Decisions
//! - Uses Tokio's signal handling; nothing runs in the OS signal context
//! - Both signals are treated the same: the receiver decides what to do

use std::fmt;

use tokio::sync::mpsc;

use crate::lifecycle::event_loop::EventLoop;

/// A recognized termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Injects signals into a [`Signals`] source created by [`Signals::channel`].
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<TerminationSignal>,
}

impl SignalSender {
    /// Deliver a signal. Returns false if the receiving side is gone.
    pub fn send(&self, signal: TerminationSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// A source of termination signals, consumed when attached to a loop.
#[derive(Debug)]
pub struct Signals {
    rx: mpsc::UnboundedReceiver<TerminationSignal>,
    os: Option<mpsc::UnboundedSender<TerminationSignal>>,
}

impl Signals {
    /// Signals delivered to this process by the OS.
    pub fn os() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { rx, os: Some(tx) }
    }

    /// Signals delivered only through the returned sender.
    pub fn channel() -> (SignalSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SignalSender { tx }, Self { rx, os: None })
    }

    /// Register OS handlers (if any) with the loop and hand back the receiver
    /// the loop reads deliveries from.
    pub(crate) fn attach(self, event_loop: &EventLoop) -> mpsc::UnboundedReceiver<TerminationSignal> {
        if let Some(tx) = self.os {
            install_os_handlers(event_loop, tx);
        }
        self.rx
    }
}

#[cfg(unix)]
fn install_os_handlers(event_loop: &EventLoop, tx: mpsc::UnboundedSender<TerminationSignal>) {
    use tokio::signal::unix::{signal, SignalKind};

    let _guard = event_loop.enter();
    for (kind, delivered) in [
        (SignalKind::interrupt(), TerminationSignal::Interrupt),
        (SignalKind::terminate(), TerminationSignal::Terminate),
    ] {
        let mut stream = match signal(kind) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(signal = %delivered, error = %e, "Failed to install signal handler");
                continue;
            }
        };

        let tx = tx.clone();
        event_loop.spawn(async move {
            while stream.recv().await.is_some() {
                if tx.send(delivered).is_err() {
                    break;
                }
            }
        });
        tracing::debug!(signal = %delivered, "Signal handler installed");
    }
}

#[cfg(not(unix))]
fn install_os_handlers(event_loop: &EventLoop, tx: mpsc::UnboundedSender<TerminationSignal>) {
    event_loop.spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                break;
            }
            if tx.send(TerminationSignal::Interrupt).is_err() {
                break;
            }
        }
    });
}
