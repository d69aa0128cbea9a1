//! Error types for reply resolution.

use thiserror::Error;

/// Errors raised while turning a [`Reply`](crate::Reply) into an outbound call.
///
/// A resolve error means the reply does not fit the event it was attached
/// to. The runtime logs it and carries on.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The event lacks the payload the reply needs.
    #[error("{reply} reply needs {needs}")]
    MissingPayload {
        /// Reply variant name.
        reply: &'static str,
        /// The missing field, e.g. `"message.chat.id"`.
        needs: &'static str,
    },

    /// Start-game needs the bot's externally reachable URL.
    #[error("start_game reply needs a public URL, but none is known")]
    MissingPublicUrl,

    /// The public URL cannot be parsed.
    #[error("invalid public URL: {0}")]
    InvalidPublicUrl(String),

    /// The game URL is absent or cannot be parsed.
    #[error("invalid game URL: {0}")]
    InvalidGameUrl(String),
}

impl ResolveError {
    /// Creates a missing-payload error.
    pub fn missing(reply: &'static str, needs: &'static str) -> Self {
        Self::MissingPayload { reply, needs }
    }
}

/// Result type for reply resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;
