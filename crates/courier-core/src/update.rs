//! Inbound platform updates.
//!
//! The platform delivers updates as JSON objects identified by `update_id`
//! and carrying at most one payload of interest. The payload shape is decided
//! once, at ingestion, and stored as an [`UpdateKind`]:
//!
//! ```text
//! Update { update_id, raw }
//! ├── UpdateKind::Message(Message)             ← "message"
//! ├── UpdateKind::CallbackQuery(CallbackQuery) ← "callback_query"
//! ├── UpdateKind::InlineQuery(InlineQuery)     ← "inline_query"
//! └── UpdateKind::Other                        ← anything else
//! ```
//!
//! The untouched JSON is kept alongside so callers can reach fields this
//! crate does not model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: i64,
    /// Whether the user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Username, if the user has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A chat (private, group, supergroup or channel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Chat identifier. Negative for groups and channels.
    pub id: i64,
    /// Chat type ("private", "group", "supergroup", "channel").
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A special span inside message text (command, mention, link, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    /// Entity type, e.g. `"bot_command"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Offset in UTF-16 code units.
    pub offset: usize,
    /// Length in UTF-16 code units.
    pub length: usize,
}

impl MessageEntity {
    /// Entity type used for `/commands`.
    pub const BOT_COMMAND: &'static str = "bot_command";

    /// Returns true if this entity is a bot command.
    pub fn is_bot_command(&self) -> bool {
        self.kind == Self::BOT_COMMAND
    }
}

/// An incoming message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, unique inside its chat.
    pub message_id: i64,
    /// The chat the message belongs to.
    pub chat: Chat,
    /// Sender, absent for channel posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Special entities in the text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// Returns the message text, or an empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Returns the slice of text covered by `entity`.
    ///
    /// Entity offsets count UTF-16 code units, so the text is re-encoded
    /// before slicing. Returns `None` when the entity lies outside the text.
    pub fn entity_text(&self, entity: &MessageEntity) -> Option<String> {
        let text = self.text.as_deref()?;
        let units: Vec<u16> = text.encode_utf16().collect();
        let end = entity.offset.checked_add(entity.length)?;
        let slice = units.get(entity.offset..end)?;
        String::from_utf16(slice).ok()
    }
}

/// A button press on an inline keyboard or a game launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Query identifier, used to answer it.
    pub id: String,
    /// The user who pressed the button.
    pub from: User,
    /// The message carrying the button, if it is still available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Identifier of an inline message, for buttons on inline results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    /// Callback data attached to the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Short name of the game to launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_short_name: Option<String>,
}

/// An inline query typed in another chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Query identifier, used to answer it.
    pub id: String,
    /// The user who typed the query.
    pub from: User,
    /// Query text.
    #[serde(default)]
    pub query: String,
    /// Pagination offset.
    #[serde(default)]
    pub offset: String,
}

/// The payload shape carried by an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateKind {
    /// A new incoming message.
    Message(Message),
    /// A callback query.
    CallbackQuery(CallbackQuery),
    /// An inline query.
    InlineQuery(InlineQuery),
    /// Any payload this crate does not model.
    Other,
}

impl UpdateKind {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::CallbackQuery(_) => "callback_query",
            Self::InlineQuery(_) => "inline_query",
            Self::Other => "other",
        }
    }
}

/// Fields read from the raw JSON to decide the kind.
#[derive(Deserialize)]
struct Envelope {
    update_id: i64,
    message: Option<Message>,
    callback_query: Option<CallbackQuery>,
    inline_query: Option<InlineQuery>,
}

/// One inbound unit of platform activity.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Platform-issued identifier.
    pub update_id: i64,
    /// Decoded payload.
    pub kind: UpdateKind,
    raw: Value,
}

impl Update {
    /// Decodes an update from its raw JSON.
    ///
    /// If more than one payload is present the most specific one wins:
    /// inline query, then callback query, then message.
    pub fn from_value(raw: Value) -> Result<Self, DecodeError> {
        let envelope =
            Envelope::deserialize(&raw).map_err(|e| DecodeError::update(e.to_string()))?;

        let kind = if let Some(query) = envelope.inline_query {
            UpdateKind::InlineQuery(query)
        } else if let Some(query) = envelope.callback_query {
            UpdateKind::CallbackQuery(query)
        } else if let Some(message) = envelope.message {
            UpdateKind::Message(message)
        } else {
            UpdateKind::Other
        };

        Ok(Self {
            update_id: envelope.update_id,
            kind,
            raw,
        })
    }

    /// Returns the message payload, if any.
    pub fn message(&self) -> Option<&Message> {
        match &self.kind {
            UpdateKind::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the callback query payload, if any.
    pub fn callback_query(&self) -> Option<&CallbackQuery> {
        match &self.kind {
            UpdateKind::CallbackQuery(query) => Some(query),
            _ => None,
        }
    }

    /// Returns the inline query payload, if any.
    pub fn inline_query(&self) -> Option<&InlineQuery> {
        match &self.kind {
            UpdateKind::InlineQuery(query) => Some(query),
            _ => None,
        }
    }

    /// Returns the JSON this update was decoded from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_message_update() {
        let update = Update::from_value(json!({
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": 99, "type": "private"},
                "from": {"id": 42, "is_bot": false, "first_name": "Ada", "username": "ada"},
                "text": "hello",
                "date": 1700000000
            }
        }))
        .unwrap();

        assert_eq!(update.update_id, 10);
        let message = update.message().unwrap();
        assert_eq!(message.chat.id, 99);
        assert_eq!(message.text(), "hello");
        assert_eq!(message.from.as_ref().unwrap().username.as_deref(), Some("ada"));
        assert_eq!(update.raw()["message"]["date"], 1700000000);
    }

    #[test]
    fn test_decode_callback_query_update() {
        let update = Update::from_value(json!({
            "update_id": 11,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 42, "first_name": "Ada"},
                "game_short_name": "runner"
            }
        }))
        .unwrap();

        let query = update.callback_query().unwrap();
        assert_eq!(query.id, "cb-1");
        assert_eq!(query.game_short_name.as_deref(), Some("runner"));
        assert!(update.message().is_none());
    }

    #[test]
    fn test_decode_inline_query_update() {
        let update = Update::from_value(json!({
            "update_id": 12,
            "inline_query": {"id": "iq-1", "from": {"id": 1}, "query": "game"}
        }))
        .unwrap();

        assert_eq!(update.kind.name(), "inline_query");
        assert_eq!(update.inline_query().unwrap().query, "game");
    }

    #[test]
    fn test_unknown_payload_is_other() {
        let update = Update::from_value(json!({
            "update_id": 13,
            "edited_message": {"message_id": 1, "chat": {"id": 1}}
        }))
        .unwrap();

        assert_eq!(update.kind, UpdateKind::Other);
    }

    #[test]
    fn test_missing_update_id_is_rejected() {
        let err = Update::from_value(json!({"message": {}})).unwrap_err();
        assert!(matches!(err, DecodeError::Update { .. }));
    }

    #[test]
    fn test_entity_text_counts_utf16_units() {
        let message = Message {
            message_id: 1,
            chat: Chat {
                id: 1,
                kind: "private".into(),
            },
            from: None,
            text: Some("🎮 /play now".into()),
            entities: vec![],
        };
        // The emoji takes two UTF-16 units, the space one more.
        let entity = MessageEntity {
            kind: MessageEntity::BOT_COMMAND.into(),
            offset: 3,
            length: 5,
        };
        assert_eq!(message.entity_text(&entity).as_deref(), Some("/play"));

        let out_of_range = MessageEntity {
            kind: MessageEntity::BOT_COMMAND.into(),
            offset: 10,
            length: 50,
        };
        assert_eq!(message.entity_text(&out_of_range), None);
    }
}
