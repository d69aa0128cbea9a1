//! Runtime error types.

use thiserror::Error;

use courier_core::{ApiError, TransportError};

use crate::config::ConfigError;

/// Errors that stop a bot from starting.
///
/// Once a bot is running, failures are logged instead of returned.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The inbound transport could not be brought up.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The outbound API client could not be built.
    #[error("API client error: {0}")]
    Api(#[from] ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
