//! Server supervisor.
//!
//! # State Machine
//! ```text
//! create ──▶ Created ──deploy──▶ Running ──stop/signal/mount failure──▶ Stopped
//! ```
//! There is no transition out of `Stopped`.
//!
//! # Data Flow
//! ```text
//! Server::create(config, logger)
//!     → share config + logger, build engine, build event loop
//! Server::deploy
//!     → signal handlers on the loop
//!     → mount.rs (every device → endpoint)
//!     → Engine::attach → EventLoop::run (blocks)
//!     → shutdown line, Stopped
//! ```

pub mod mount;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::engine::{Engine, EngineError, MountRegistry, RtspEngine};
use crate::lifecycle::{EventLoop, Shared, Signals, StopHandle, TerminationSignal};
use crate::observability::Logger;

pub use mount::{mount_devices, DeviceFailure, MountReport};

/// Lifecycle state of a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Running,
    Stopped,
}

/// Errors raised by the server supervisor.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to mount {failed} of {total} device(s)")]
    Mount { failed: usize, total: usize },

    #[error("server cannot be deployed from state {0:?}")]
    AlreadyDeployed(ServerState),
}

/// Owns the engine and the event loop for one run of the gateway.
pub struct Server {
    // Field order is drop order: loop and engine go before config and logger.
    event_loop: EventLoop,
    engine: Mutex<Box<dyn Engine>>,
    config: Shared<Config>,
    logger: Shared<Logger>,
    state: Mutex<ServerState>,
}

impl Server {
    /// Create a server backed by the built-in [`RtspEngine`].
    pub fn create(
        config: &Shared<Config>,
        logger: &Shared<Logger>,
    ) -> Result<Shared<Server>, ServerError> {
        Self::create_with(config, logger, RtspEngine::from_config)
    }

    /// Create a server backed by the engine `make_engine` builds.
    ///
    /// Takes a reference to `config` and `logger`. If any step fails, every
    /// reference and handle acquired so far is released before the first
    /// error is returned.
    pub fn create_with<E, F>(
        config: &Shared<Config>,
        logger: &Shared<Logger>,
        make_engine: F,
    ) -> Result<Shared<Server>, ServerError>
    where
        E: Engine + 'static,
        F: FnOnce(&Config) -> Result<E, EngineError>,
    {
        let config = config.share();
        let logger = logger.share();
        let engine = make_engine(&config)?;
        let event_loop = EventLoop::new().map_err(EngineError::EventLoop)?;

        Ok(Shared::new(Server {
            event_loop,
            engine: Mutex::new(Box::new(engine)),
            config,
            logger,
            state: Mutex::new(ServerState::Created),
        }))
    }

    /// Deploy with handlers for the process's SIGINT and SIGTERM.
    pub fn deploy(&self) -> Result<(), ServerError> {
        self.deploy_with(Signals::os())
    }

    /// Mount every device, attach the engine and run until stopped.
    ///
    /// Blocks until the loop is stopped by a signal from `signals` or through
    /// [`Server::stop_handle`]. On a mount failure the endpoints mounted in
    /// this pass are removed again and the server stops without running.
    pub fn deploy_with(&self, signals: Signals) -> Result<(), ServerError> {
        {
            let mut state = self.lock_state();
            if *state != ServerState::Created {
                return Err(ServerError::AlreadyDeployed(*state));
            }
            *state = ServerState::Running;
        }

        self.logger.info(format_args!("starting deployment"));

        self.logger.debug(format_args!("adding signal handlers"));
        let deliveries = signals.attach(&self.event_loop);
        self.event_loop.spawn(handle_signals(
            deliveries,
            self.logger.share(),
            self.event_loop.stop_handle(),
        ));

        let result = self.mount_and_run();
        if let Err(e) = &result {
            self.logger.error(format_args!("errors occurred while deploying server: {e}"));
        }

        *self.lock_state() = ServerState::Stopped;
        self.logger.info(format_args!("server shutting down"));
        result
    }

    fn mount_and_run(&self) -> Result<(), ServerError> {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        let registry = engine.mount_points();

        self.logger.debug(format_args!("mounting devices"));
        let report = mount::mount_devices(&self.config, registry.as_ref(), &self.logger);
        if !report.is_success() {
            self.logger.error(format_args!("failed to mount device(s)"));
            mount::unmount(registry.as_ref(), &report.mounted, &self.logger);
            return Err(ServerError::Mount {
                failed: report.failures.len(),
                total: report.total(),
            });
        }

        self.logger.debug(format_args!("attaching engine"));
        engine.attach(&self.event_loop)?;
        drop(engine);

        self.logger.debug(format_args!("starting main loop"));
        self.event_loop.run();
        Ok(())
    }

    /// Handle that stops the running loop from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.event_loop.stop_handle()
    }

    pub fn state(&self) -> ServerState {
        *self.lock_state()
    }

    pub fn config(&self) -> &Shared<Config> {
        &self.config
    }

    pub fn logger(&self) -> &Shared<Logger> {
        &self.logger
    }

    /// The engine's endpoint registry.
    pub fn mount_points(&self) -> Arc<dyn MountRegistry> {
        self.engine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mount_points()
    }

    fn lock_state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state())
            .field("port", &self.config.port)
            .field("devices", &self.config.devices.len())
            .finish_non_exhaustive()
    }
}

async fn handle_signals(
    mut deliveries: mpsc::UnboundedReceiver<TerminationSignal>,
    logger: Shared<Logger>,
    stop: StopHandle,
) {
    while let Some(signal) = deliveries.recv().await {
        logger.info(format_args!("signal received ({signal})"));
        stop.stop();
    }
}
