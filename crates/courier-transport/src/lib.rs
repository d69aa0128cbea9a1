//! # Courier Transport
//!
//! Network transports for the Courier chat-bot framework.
//!
//! Outbound calls always go through [`HttpApiCaller`]. Inbound updates arrive
//! through exactly one of two strategies, chosen by the runtime:
//!
//! | Strategy | Type | How updates arrive |
//! |----------|------|--------------------|
//! | Push | [`WebhookServer`] (+ optional [`NgrokTunnel`]) | The platform POSTs JSON to our public URL |
//! | Poll | [`Poller`] | We long-poll `getUpdates` in a loop |
//!
//! Both strategies write [`Inbound`](courier_core::Inbound) records into the
//! same [`InboundSink`].
//!
//! ## Features
//!
//! - `http-client`: outbound [`HttpApiCaller`] (reqwest)
//! - `http-server`: push [`WebhookServer`] (axum)
//! - `polling`: pull [`Poller`]
//! - `tunnel`: [`NgrokTunnel`] child-process tunnel
//! - `full` *(default)*: all of the above
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  courier-runtime    │  (event core, replies)
//! ├─────────────────────┤
//! │  courier-core       │  (Inbound, ApiCaller)
//! ├─────────────────────┤
//! │  courier-transport  │  <- This crate
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```

use courier_core::Inbound;
use tokio::sync::mpsc;

#[cfg(feature = "http-client")]
pub mod http;

#[cfg(feature = "http-server")]
pub mod server;

#[cfg(feature = "polling")]
pub mod polling;

#[cfg(feature = "tunnel")]
pub mod tunnel;

#[cfg(feature = "http-client")]
pub use http::HttpApiCaller;

#[cfg(feature = "http-server")]
pub use server::{ListenerHandle, WebhookServer};

#[cfg(feature = "polling")]
pub use polling::{Poller, PollerConfig};

#[cfg(feature = "tunnel")]
pub use tunnel::{NgrokTunnel, Tunnel};

/// Where transports deliver raw inbound records.
pub type InboundSink = mpsc::UnboundedSender<Inbound>;
