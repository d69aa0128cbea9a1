//! What a reply handler may return.

use serde_json::Value;

use courier_core::{Params, UpdateKind};

use crate::reply::{Reply, Trigger};

/// A handler's answer: an explicit [`Reply`], a plain value, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// An explicit reply intent.
    Reply(Reply),
    /// A plain value; the reply variant is inferred from the update.
    Value(Value),
    /// Do not reply.
    Nothing,
}

impl Response {
    /// Turns the response into a reply for `trigger`.
    ///
    /// Plain values are mapped by the payload the update carries:
    /// a message gets a text reply, a callback query an acknowledgement
    /// and an inline query an inline answer. `None` means there is no
    /// sensible reply.
    pub fn into_reply(self, trigger: Trigger<'_>) -> Option<Reply> {
        let value = match self {
            Self::Reply(reply) => return Some(reply),
            Self::Nothing => return None,
            Self::Value(value) => value,
        };

        let Trigger::Update(update) = trigger else {
            return None;
        };

        match update.kind {
            UpdateKind::Message(_) => Some(Reply::Text(match value {
                Value::String(text) => text,
                other => other.to_string(),
            })),
            UpdateKind::CallbackQuery(_) => Some(Reply::Callback(object_params(value))),
            UpdateKind::InlineQuery(_) => Some(Reply::Inline(object_params(value))),
            UpdateKind::Other => None,
        }
    }
}

fn object_params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

impl From<Value> for Response {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self::Value(Value::String(text.to_string()))
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self::Value(Value::String(text))
    }
}

impl From<()> for Response {
    fn from(_: ()) -> Self {
        Self::Nothing
    }
}

impl<T> From<Option<T>> for Response
where
    T: Into<Response>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nothing, Into::into)
    }
}
