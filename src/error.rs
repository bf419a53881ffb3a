//! Top-level error for the gateway binary and embedders.

use thiserror::Error;

use crate::config::{LoadError, ValidationError};
use crate::engine::EngineError;
use crate::observability::LoggerError;
use crate::server::ServerError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load configuration: {0}")]
    Load(#[from] LoadError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to set up logger: {0}")]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to install log subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

impl From<EngineError> for Error {
    fn from(e: EngineError) -> Self {
        Error::Server(ServerError::Engine(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
