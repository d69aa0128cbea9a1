//! Courier Runtime - the bot runtime of the Courier chat-bot framework.
//!
//! This crate provides:
//! - The [`Bot`] runtime: transport start-up, deduplicating event core,
//!   update and notification streams, outbound calls and replies
//! - Named shutdown hooks run once on any termination path
//! - Layered configuration (`figment`)
//! - Logging configuration (`tracing-subscriber`)
//!
//! # Transports
//!
//! Exactly one inbound transport runs per bot, chosen by `transport` in the
//! configuration:
//!
//! - `webhook` (default): an HTTP server receiving pushed updates, exposed
//!   through a tunnel unless `webhook.public_url` is set
//! - `polling`: a `getUpdates` long-poll loop
//!
//! ```ignore
//! use courier_runtime::{Bot, config::load_config, logging};
//! use courier_core::Token;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bot = Bot::start(config, Token::new(std::env::var("COURIER_TOKEN")?)).await?;
//!     spawn_replies(bot.subscribe(), bot.reply(|_: &Update| "hello"));
//!
//!     bot.run_until_signal().await;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod event_core;
pub mod hooks;
pub mod logging;
pub mod reply;

#[cfg(test)]
mod test_support;

// Re-exports
pub use bot::Bot;
pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig, TransportMode};
pub use error::{RuntimeError, RuntimeResult};
pub use event_core::EventCore;
pub use hooks::ShutdownHooks;
pub use logging::{LoggingBuilder, SpanEvents};
pub use reply::{Replier, ReplyFn, spawn_replies};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
