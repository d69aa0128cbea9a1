//! Unified error types for the Courier core.
//!
//! Each layer gets its own error enum. Reply resolution errors live in
//! `courier-framework`, startup errors in `courier-runtime`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised while bringing up or running an inbound transport.
///
/// These are fatal at startup: a bot in push mode cannot run without its
/// listening socket or its public tunnel.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// The public tunnel could not be established.
    #[error("tunnel failed: {0}")]
    Tunnel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by outbound API calls.
///
/// An `ApiError` never stops the bot; it is surfaced to whoever issued the
/// call and logged.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request could not be built (bad base URL, bad method name).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure while sending or receiving.
    #[error("network error: {0}")]
    Network(String),

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body was not the expected JSON envelope.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The platform answered with `ok: false`.
    #[error("platform error {code}: {description}")]
    Platform {
        /// Platform error code (usually mirrors the HTTP status).
        code: i64,
        /// Human-readable description from the platform.
        description: String,
    },
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised while decoding inbound data.
///
/// The runtime treats these as recoverable: the offending record is dropped
/// with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A raw update could not be decoded.
    #[error("malformed update: {reason}")]
    Update {
        /// Reason for failure.
        reason: String,
    },

    /// A score token could not be decoded.
    #[error("malformed score token '{token}': {reason}")]
    ScoreToken {
        /// The offending token.
        token: String,
        /// Reason for failure.
        reason: String,
    },
}

impl DecodeError {
    /// Creates an update decode error.
    pub fn update(reason: impl Into<String>) -> Self {
        Self::Update {
            reason: reason.into(),
        }
    }

    /// Creates a score token decode error.
    pub fn score_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ScoreToken {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for outbound API calls.
pub type ApiResult<T> = Result<T, ApiError>;
