//! # Courier Core
//!
//! Shared building blocks for the Courier chat-bot framework.
//!
//! This crate has no networking of its own. It defines the vocabulary every
//! other layer speaks:
//!
//! - **Updates**: inbound platform activity decoded once into a tagged union
//!   ([`Update`], [`UpdateKind`])
//! - **Notifications**: side-channel signals decoded from request metadata
//!   ([`Notification`], [`ScoreToken`])
//! - **Inbound records**: what transports hand to the runtime ([`Inbound`])
//! - **Outbound calls**: `(method, params)` pairs and the [`ApiCaller`] seam
//! - **Errors**: [`TransportError`], [`ApiError`], [`DecodeError`]
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐  Inbound   ┌──────────────┐  Update / Notification
//! │  Transport  │──────────▶│  Event core  │──────────────────────▶ subscribers
//! └─────────────┘            └──────────────┘
//!                                   │ OutboundCall
//!                                   ▼
//!                            ┌──────────────┐
//!                            │  ApiCaller   │──▶ platform HTTP API
//!                            └──────────────┘
//! ```

pub mod call;
pub mod error;
pub mod inbound;
pub mod notification;
pub mod token;
pub mod update;

pub use call::{ApiCaller, BoxedApiCaller, OutboundCall, Params};
pub use error::{ApiError, ApiResult, DecodeError, TransportError, TransportResult};
pub use inbound::{Inbound, RequestMeta, split_updates};
pub use notification::{Notification, NotificationKind, SCORE_ID_PARAM, ScoreNotification, ScoreToken};
pub use token::Token;
pub use update::{
    CallbackQuery, Chat, InlineQuery, Message, MessageEntity, Update, UpdateKind, User,
};
