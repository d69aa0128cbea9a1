//! Side-channel notifications.
//!
//! A game launched through a "start game" reply receives a score URL: the
//! public URL with a `score_id=<token>` query pair appended. When the game reports a score it
//! requests that URL; the webhook server forwards the request metadata and
//! the runtime decodes it into a [`Notification`].
//!
//! The token is the hex encoding of `"<user_id>-<message_id>-<chat_id>"`.
//! Chat ids are negative for groups, so decoding splits into at most three
//! parts and the last one keeps its sign.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::call::Params;
use crate::error::DecodeError;
use crate::inbound::RequestMeta;

/// Query parameter carrying the encoded [`ScoreToken`].
pub const SCORE_ID_PARAM: &str = "score_id";

/// The identifiers needed to set a game score.
///
/// Identifiers are kept as the integer literals they were built or decoded
/// from, so `"007"` stays `"007"` and ids beyond the `i64` range survive a
/// round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreToken {
    /// The player.
    pub user_id: String,
    /// The message carrying the game.
    pub message_id: String,
    /// The chat of that message.
    pub chat_id: String,
}

impl ScoreToken {
    /// Creates a token.
    pub fn new(user_id: impl ToString, message_id: impl ToString, chat_id: impl ToString) -> Self {
        Self {
            user_id: user_id.to_string(),
            message_id: message_id.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Encodes the token as a hex string.
    pub fn encode(&self) -> String {
        hex::encode(format!(
            "{}-{}-{}",
            self.user_id, self.message_id, self.chat_id
        ))
    }

    /// Decodes a token produced by [`ScoreToken::encode`].
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(token)
            .map_err(|e| DecodeError::score_token(token, format!("invalid hex: {e}")))?;
        let joined = String::from_utf8(bytes)
            .map_err(|e| DecodeError::score_token(token, format!("invalid UTF-8: {e}")))?;

        let mut parts = joined.splitn(3, '-');
        let (Some(user), Some(message), Some(chat)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::score_token(token, "expected three fields"));
        };

        let field = |name: &str, raw: &str| {
            if is_integer_literal(raw) {
                Ok(raw.to_string())
            } else {
                Err(DecodeError::score_token(
                    token,
                    format!("{name} '{raw}' is not an integer"),
                ))
            }
        };

        Ok(Self {
            user_id: field("user_id", user)?,
            message_id: field("message_id", message)?,
            chat_id: field("chat_id", chat)?,
        })
    }

    /// Returns the identifiers as call parameters.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("user_id".into(), id_value(&self.user_id));
        params.insert("message_id".into(), id_value(&self.message_id));
        params.insert("chat_id".into(), id_value(&self.chat_id));
        params
    }
}

/// An optional `-` followed by at least one ASCII digit.
fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// A JSON number when that is lossless, the literal otherwise.
fn id_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(n) if n.to_string() == raw => Value::from(n),
        _ => Value::String(raw.to_string()),
    }
}

impl fmt::Display for ScoreToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for ScoreToken {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// A game score report.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreNotification {
    /// Decoded identifiers.
    pub token: ScoreToken,
    /// Remaining query parameters of the request (e.g. `score`).
    pub params: Params,
}

impl ScoreNotification {
    /// Returns the notification payload.
    ///
    /// Extra query parameters come first and the decoded identifiers are
    /// written on top, so a request cannot redirect the score elsewhere.
    pub fn payload(&self) -> Params {
        let mut payload = self.params.clone();
        payload.extend(self.token.to_params());
        payload
    }
}

/// Notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// A game score submission.
    GameScore,
}

/// A side-channel signal decoded from transport metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A game score submission.
    GameScore(ScoreNotification),
}

impl Notification {
    /// Extracts a notification from request metadata.
    ///
    /// Returns `None` when the request carries no notification and
    /// `Some(Err(_))` when it carries a malformed one.
    pub fn from_request(meta: &RequestMeta) -> Option<Result<Self, DecodeError>> {
        let raw = meta.query.get(SCORE_ID_PARAM)?;
        let result = ScoreToken::decode(raw).map(|token| {
            let params = meta
                .query
                .iter()
                .filter(|(key, _)| key.as_str() != SCORE_ID_PARAM)
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect();
            Self::GameScore(ScoreNotification { token, params })
        });
        Some(result)
    }

    /// Returns the notification category.
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::GameScore(_) => NotificationKind::GameScore,
        }
    }

    /// Returns the notification payload.
    pub fn payload(&self) -> Params {
        match self {
            Self::GameScore(score) => score.payload(),
        }
    }
}
