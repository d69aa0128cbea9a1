//! Configuration module for the Courier runtime.
//!
//! Layered figment loading, the [`CourierConfig`] schema, and validation.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ApiConfig, CourierConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PollingConfig,
    SpanEventConfig, TransportMode, WebhookConfig,
};
pub use validation::validate_config;
