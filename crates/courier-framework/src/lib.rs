//! # Courier Framework
//!
//! Building blocks application code uses on top of the update streams:
//!
//! - [`Filter`]s select updates (`text`, `command`, `callbacks`, ...)
//! - [`Reply`] intents describe how to answer, resolved into
//!   [`OutboundCall`](courier_core::OutboundCall)s against a [`Trigger`]
//! - [`Response`] is what a reply handler returns; plain values fall back to
//!   a reply inferred from the update

pub mod error;
pub mod filter;
pub mod replies;
pub mod reply;
pub mod response;

pub use error::{ResolveError, ResolveResult};
pub use filter::{
    Filter, PredicateFn, UpdateStreamExt, callbacks, command, game, inline_queries, text,
    text_regex,
};
pub use reply::{AsTrigger, Reply, ResolveContext, Trigger};
pub use response::Response;
