//! # Courier
//!
//! A thin, stream-based chat-bot framework for Rust.
//!
//! ## Overview
//!
//! A bot receives platform updates over one transport, deduplicates them and
//! hands them out as streams. Application code narrows the streams with
//! filters and answers with reply intents that are resolved against the
//! triggering update into API calls.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐  Inbound   ┌────────────┐  Update        ┌──────────┐  Reply   ┌───────────┐
//! │ Webhook / Poller   │──────────▶│ Event core │──────────────▶│ Filters  │────────▶│ Resolver  │──▶ API
//! └────────────────────┘            └────────────┘  Notification  └──────────┘          └───────────┘
//! ```
//!
//! - **Transport**: webhook server (optionally tunnelled) or `getUpdates` polling
//! - **Event core**: deduplication by update id, history, fan-out streams
//! - **Filters**: `text`, `command`, `callbacks`, `inline_queries`, `game`
//! - **Replies**: text, markdown, html, callback, start game, inline results,
//!   send game, send score
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let bot = Bot::start(config, Token::new(std::env::var("COURIER_TOKEN")?)).await?;
//!
//!     spawn_replies(
//!         bot.subscribe().matching(command("start")),
//!         bot.reply(|_: &Update| replies::text("Hello!")),
//!     );
//!
//!     bot.run_until_signal().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;
pub use courier_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use courier_runtime::config::{load_config, load_config_from_file};
    pub use courier_runtime::{Bot, CourierConfig, ReplyFn, TransportMode, logging, spawn_replies};

    // Filters
    pub use courier_framework::{
        Filter, UpdateStreamExt, callbacks, command, game, inline_queries, text, text_regex,
    };

    // Replies
    pub use courier_framework::{Reply, Response, replies};

    // Data model
    pub use courier_core::{Notification, Params, Token, Update, UpdateKind};
}
