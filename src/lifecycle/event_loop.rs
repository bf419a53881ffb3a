//! Single-threaded run loop with an explicit stop handle.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, EnterGuard, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Requests the event loop to stop.
///
/// Cloneable and usable from any thread. A stop request is sticky: once
/// stopped, the loop never runs again.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request the loop to stop.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// Cooperative event loop driving the running phase.
///
/// Everything spawned on the loop runs on the thread that calls [`run`],
/// so loop state is never touched from an OS signal context.
///
/// [`run`]: EventLoop::run
pub struct EventLoop {
    runtime: Runtime,
    stop: StopHandle,
}

impl EventLoop {
    /// Create a loop that is not yet running.
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            stop: StopHandle::new(),
        })
    }

    /// A handle that stops this loop.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Queue a task on the loop. It makes progress while [`EventLoop::run`] blocks.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Enter the loop's context, e.g. to register I/O resources.
    pub fn enter(&self) -> EnterGuard<'_> {
        self.runtime.enter()
    }

    /// Block the calling thread until a stop is requested.
    pub fn run(&self) {
        self.runtime.block_on(self.stop.stopped());
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}
